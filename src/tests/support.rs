// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared fixtures: deterministic lineages and a minimal admitting ledger.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::block::{random_certificates, CertBlock, Certificate};
use crate::builder::CertBlockBuilder;
use crate::engine::VerificationEngine;
use crate::ledger::{BlockVerifier, LedgerBlock, MemoryChain, RejectReason, Verdict};
use crate::map::SparseMerkleMap;
use crate::signer::Signer;
use crate::types::{certchain_verifier, Roster, ServerIdentity};
use crate::unspent::IndexDelta;

pub fn lineage(seed: u8) -> CertBlockBuilder {
    CertBlockBuilder::new(
        Signer::from_secret(&[seed; 32]),
        SparseMerkleMap::new([seed.wrapping_add(100); 32]),
    )
}

pub fn certs(seed: u64, identities: &[&str]) -> Vec<Certificate> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_certificates(&mut rng, identities)
}

pub fn roster() -> Roster {
    Roster::new(vec![ServerIdentity::new("node-0", "http://127.0.0.1:9")])
}

/// Admits blocks the way a ledger does: verify, store, then apply the delta.
pub struct TestLedger {
    pub chain: Arc<MemoryChain>,
    pub engine: Arc<VerificationEngine>,
}

impl TestLedger {
    pub fn new() -> Self {
        let chain = Arc::new(MemoryChain::new());
        let engine = Arc::new(VerificationEngine::new(chain.clone()));
        Self { chain, engine }
    }

    pub fn genesis_candidate(cert: &CertBlock) -> LedgerBlock {
        LedgerBlock::genesis(roster(), certchain_verifier(), cert.to_payload().unwrap())
    }

    pub fn successor_candidate(prior: &LedgerBlock, cert: &CertBlock) -> LedgerBlock {
        LedgerBlock::successor(prior, certchain_verifier(), cert.to_payload().unwrap())
    }

    pub fn genesis(&self, cert: &CertBlock) -> Result<LedgerBlock, RejectReason> {
        self.admit(Self::genesis_candidate(cert))
    }

    pub fn append(&self, prior: &LedgerBlock, cert: &CertBlock) -> Result<LedgerBlock, RejectReason> {
        self.admit(Self::successor_candidate(prior, cert))
    }

    pub fn admit(&self, candidate: LedgerBlock) -> Result<LedgerBlock, RejectReason> {
        if let Verdict::Rejected(reason) = self.engine.verify(&candidate.id, &candidate) {
            return Err(reason);
        }
        if !self.chain.insert(candidate.clone()) {
            self.engine.release(&candidate);
            return Err(RejectReason::Replay);
        }
        self.record(&candidate);
        Ok(candidate)
    }

    /// Apply an admitted block's delta, as propagation would.
    pub fn record(&self, block: &LedgerBlock) {
        let cert = block.cert_block().unwrap();
        self.engine.index().apply(&IndexDelta::admitted(&cert, block.handle()));
    }
}

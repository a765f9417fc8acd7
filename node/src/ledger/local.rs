// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-process ledger shared by the nodes of one roster.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use certchain::{
    BlockId, BlockVerifier, ChainError, ChainReader, LedgerBlock, MemoryChain, RejectReason, Roster, ServerIdentity,
    Verdict, VerifierId,
};
use parking_lot::{Mutex, RwLock};
use tracing::{error, info};

use super::block_log::BlockLogWriter;
use super::{BlockLogError, LedgerError, LedgerService};

pub struct LocalLedger {
    /// Serializes admissions. Verifiers run under it and may read blocks,
    /// so block reads never take it.
    append: Mutex<()>,
    chain: MemoryChain,
    order: RwLock<Vec<BlockId>>,
    verifiers: RwLock<HashMap<String, Arc<dyn BlockVerifier>>>,
    log: Option<Mutex<BlockLogWriter>>,
}

impl LocalLedger {
    pub fn in_memory() -> Self {
        Self {
            append: Mutex::new(()),
            chain: MemoryChain::new(),
            order: RwLock::new(Vec::new()),
            verifiers: RwLock::new(HashMap::new()),
            log: None,
        }
    }

    /// Open a ledger backed by a block log, replaying what it holds.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BlockLogError> {
        let (log, existing) = BlockLogWriter::open(path)?;
        let mut ledger = Self::in_memory();
        {
            let mut order = ledger.order.write();
            for block in existing {
                order.push(block.id);
                ledger.chain.insert(block);
            }
        }
        info!(blocks = ledger.chain.len(), path = %log.path().display(), "block log replayed");
        ledger.log = Some(Mutex::new(log));
        Ok(ledger)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    fn voters(&self, candidate: &LedgerBlock) -> Vec<Arc<dyn BlockVerifier>> {
        let verifiers = self.verifiers.read();
        candidate
            .roster
            .iter()
            .filter_map(|member| verifiers.get(&member.address))
            .filter(|v| v.verifier_id() == candidate.verifier)
            .cloned()
            .collect()
    }

    fn admit(&self, candidate: LedgerBlock) -> Result<LedgerBlock, LedgerError> {
        let _guard = self.append.lock();

        let voters = self.voters(&candidate);
        if voters.is_empty() {
            return Err(LedgerError::NoVerifier(candidate.verifier));
        }

        let mut accepted: Vec<&Arc<dyn BlockVerifier>> = Vec::with_capacity(voters.len());
        for verifier in &voters {
            match verifier.verify(&candidate.id, &candidate) {
                Verdict::Accepted => accepted.push(verifier),
                Verdict::Rejected(reason) => {
                    release_all(&accepted, &candidate);
                    return Err(LedgerError::Rejected(reason));
                }
            }
        }

        if self.chain.contains(&candidate.id) {
            release_all(&accepted, &candidate);
            return Err(LedgerError::Rejected(RejectReason::Replay));
        }

        if let Some(log) = &self.log {
            if let Err(source) = log.lock().append(&candidate) {
                error!(block = %candidate.id, error = %source, "block log append failed");
                release_all(&accepted, &candidate);
                return Err(LedgerError::Storage {
                    candidate: candidate.id,
                    source,
                });
            }
        }

        self.order.write().push(candidate.id);
        self.chain.insert(candidate.clone());
        info!(block = %candidate.id, index = candidate.index, genesis = %candidate.genesis, "block admitted");
        Ok(candidate)
    }
}

fn release_all(accepted: &[&Arc<dyn BlockVerifier>], candidate: &LedgerBlock) {
    for verifier in accepted {
        verifier.release(candidate);
    }
}

impl ChainReader for LocalLedger {
    fn block(&self, id: &BlockId) -> Result<Option<LedgerBlock>, ChainError> {
        self.chain.block(id)
    }
}

impl LedgerService for LocalLedger {
    fn register_verifier(&self, member: ServerIdentity, verifier: Arc<dyn BlockVerifier>) {
        self.verifiers.write().insert(member.address, verifier);
    }

    fn create_genesis(&self, roster: &Roster, verifier: VerifierId, data: Vec<u8>) -> Result<LedgerBlock, LedgerError> {
        self.admit(LedgerBlock::genesis(roster.clone(), verifier, data))
    }

    fn store(&self, prior: &BlockId, verifier: VerifierId, data: Vec<u8>) -> Result<LedgerBlock, LedgerError> {
        let prior = self.chain.get(prior).ok_or(LedgerError::UnknownBlock(*prior))?;
        self.admit(LedgerBlock::successor(&prior, verifier, data))
    }

    fn blocks(&self) -> Vec<LedgerBlock> {
        let order = self.order.read();
        order.iter().filter_map(|id| self.chain.get(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certchain::{CertBlock, CertBlockBuilder, Certificate, IndexDelta, Signer, SparseMerkleMap, VerificationEngine};
    use certchain::types::certchain_verifier;

    fn member(n: u16) -> ServerIdentity {
        ServerIdentity::new(format!("node-{}", n), format!("http://127.0.0.1:{}", n))
    }

    fn lineage() -> CertBlockBuilder {
        CertBlockBuilder::new(Signer::from_secret(&[5u8; 32]), SparseMerkleMap::new([6u8; 32]))
    }

    fn cert(identity: &str) -> Vec<Certificate> {
        vec![Certificate::new(identity, identity.as_bytes().to_vec())]
    }

    fn engine_for(ledger: &Arc<LocalLedger>, who: ServerIdentity) -> Arc<VerificationEngine> {
        let engine = Arc::new(VerificationEngine::new(ledger.clone()));
        ledger.register_verifier(who, engine.clone());
        engine
    }

    fn payload(block: &CertBlock) -> Vec<u8> {
        block.to_payload().unwrap()
    }

    #[test]
    fn chain_without_verifier_is_refused() {
        let ledger = LocalLedger::in_memory();
        let roster = Roster::new(vec![member(1)]);
        let mut ca = lineage();
        let g = ca.build(&cert("a@x.com")).unwrap();
        let err = ledger.create_genesis(&roster, certchain_verifier(), payload(&g)).unwrap_err();
        assert!(matches!(err, LedgerError::NoVerifier(_)));
        assert!(ledger.is_empty());
    }

    /// Member that refuses every block.
    struct Refuser;

    impl BlockVerifier for Refuser {
        fn verifier_id(&self) -> VerifierId {
            certchain_verifier()
        }

        fn verify(&self, _candidate_id: &BlockId, _candidate: &LedgerBlock) -> Verdict {
            Verdict::Rejected(RejectReason::InvalidSignature)
        }
    }

    #[test]
    fn member_that_missed_a_delta_catches_up() {
        let ledger = Arc::new(LocalLedger::in_memory());
        let roster = Roster::new(vec![member(1), member(2)]);
        let first = engine_for(&ledger, member(1));
        let second = engine_for(&ledger, member(2));

        let mut ca = lineage();
        let g = ca.build(&cert("a@x.com")).unwrap();
        let gb = ledger.create_genesis(&roster, certchain_verifier(), payload(&g)).unwrap();
        ca.accept(&g);

        // Only the first member hears about the genesis head.
        first.index().apply(&IndexDelta::admitted(&g, gb.handle()));

        let s = ca.build(&cert("b@x.com")).unwrap();
        let fork = ca.build(&cert("d@x.com")).unwrap();
        let sb = ledger.store(&gb.id, certchain_verifier(), payload(&s)).unwrap();
        assert_eq!(sb.back_link, Some(gb.id));
        assert!(first.index().is_spent(&g.latest_head_digest));
        assert!(second.index().is_spent(&g.latest_head_digest));
        ca.accept(&s);

        // Neither member delivered S's delta; the chain still moves on.
        let t = ca.build(&cert("c@x.com")).unwrap();
        let tb = ledger.store(&sb.id, certchain_verifier(), payload(&t)).unwrap();
        assert_eq!(tb.index, 2);
        assert_eq!(ledger.len(), 3);

        let err = ledger.store(&gb.id, certchain_verifier(), payload(&fork)).unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(RejectReason::SpentPredecessor)));
    }

    #[test]
    fn one_refusal_blocks_admission_and_releases_the_rest() {
        let ledger = Arc::new(LocalLedger::in_memory());
        let roster = Roster::new(vec![member(1), member(2)]);
        let first = engine_for(&ledger, member(1));

        // Member 2 has not registered yet, so only the first member votes.
        let mut ca = lineage();
        let g = ca.build(&cert("a@x.com")).unwrap();
        let gb = ledger.create_genesis(&roster, certchain_verifier(), payload(&g)).unwrap();
        first.index().apply(&IndexDelta::admitted(&g, gb.handle()));
        ca.accept(&g);

        ledger.register_verifier(member(2), Arc::new(Refuser));
        let s = ca.build(&cert("b@x.com")).unwrap();
        let err = ledger.store(&gb.id, certchain_verifier(), payload(&s)).unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(RejectReason::InvalidSignature)));
        assert!(first.index().is_unspent(&g.latest_head_digest));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn replayed_genesis_and_unknown_prior() {
        let ledger = Arc::new(LocalLedger::in_memory());
        let roster = Roster::new(vec![member(1)]);
        let _engine = engine_for(&ledger, member(1));

        let mut ca = lineage();
        let g = ca.build(&cert("a@x.com")).unwrap();
        ledger.create_genesis(&roster, certchain_verifier(), payload(&g)).unwrap();
        let err = ledger.create_genesis(&roster, certchain_verifier(), payload(&g)).unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(RejectReason::Replay)));

        let ghost = BlockId(certchain::Digest([1; 32]));
        let err = ledger.store(&ghost, certchain_verifier(), payload(&g)).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownBlock(id) if id == ghost));
    }

    #[test]
    fn block_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.log");
        let roster = Roster::new(vec![member(1)]);
        let mut ca = lineage();
        let g = ca.build(&cert("a@x.com")).unwrap();

        let admitted = {
            let ledger = Arc::new(LocalLedger::open(&path).unwrap());
            let engine = engine_for(&ledger, member(1));
            let gb = ledger.create_genesis(&roster, certchain_verifier(), payload(&g)).unwrap();
            engine.index().apply(&IndexDelta::admitted(&g, gb.handle()));
            ca.accept(&g);
            let s = ca.build(&cert("b@x.com")).unwrap();
            let sb = ledger.store(&gb.id, certchain_verifier(), payload(&s)).unwrap();
            vec![gb, sb]
        };

        let reopened = LocalLedger::open(&path).unwrap();
        assert_eq!(reopened.blocks(), admitted);
        assert_eq!(reopened.block(&admitted[1].id).unwrap(), Some(admitted[1].clone()));
    }
}

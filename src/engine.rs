// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Verification engine: decides whether a candidate ledger block carries a
//! valid CertBlock.
//!
//! Checks, in order:
//!
//! 1. the payload decodes, the block names this verifier, the digest and
//!    head links are self-consistent;
//! 2. the signature verifies under the public key of the predecessor, or the
//!    block's own key for genesis;
//! 3. the predecessor digest is atomically consumed from the unspent index
//!    (genesis skips this).
//!
//! A predecessor digest the index has never seen is taken from the ledger:
//! the back link already resolved to an admitted block carrying that digest,
//! so its delta is applied locally before spending. A node that missed a
//! propagated delta therefore catches up on its next verification.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::block::CertBlock;
use crate::ledger::{BlockVerifier, ChainReader, LedgerBlock, RejectReason, Verdict};
use crate::signer::{verify_digest, SignatureFault};
use crate::types::{certchain_verifier, BlockId, VerifierId};
use crate::unspent::{IndexDelta, SpendError, UnspentIndex};

pub struct VerificationEngine {
    id: VerifierId,
    chain: Arc<dyn ChainReader>,
    index: Arc<UnspentIndex>,
}

impl VerificationEngine {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self::with_index(chain, Arc::new(UnspentIndex::new()))
    }

    pub fn with_index(chain: Arc<dyn ChainReader>, index: Arc<UnspentIndex>) -> Self {
        Self {
            id: certchain_verifier(),
            chain,
            index,
        }
    }

    pub fn index(&self) -> &Arc<UnspentIndex> {
        &self.index
    }

    pub fn evaluate(&self, candidate: &LedgerBlock) -> Verdict {
        match self.check(candidate) {
            Ok(()) => {
                debug!(block = %candidate.id, index = candidate.index, "cert block accepted");
                Verdict::Accepted
            }
            Err(reason) => {
                warn!(block = %candidate.id, index = candidate.index, %reason, "cert block rejected");
                Verdict::Rejected(reason)
            }
        }
    }

    fn check(&self, candidate: &LedgerBlock) -> Result<(), RejectReason> {
        if candidate.verifier != self.id {
            return Err(RejectReason::VerifierMismatch);
        }
        let cert = candidate.cert_block().map_err(|_| RejectReason::Malformed)?;
        if !cert.verify_digest() {
            return Err(RejectReason::DigestMismatch);
        }
        let head = cert.head().map_err(|_| RejectReason::Malformed)?;
        if head.prev_head_digest != cert.prev_head_digest {
            return Err(RejectReason::HeadLinkMismatch);
        }

        let prior = if cert.is_genesis() {
            None
        } else {
            Some(self.predecessor(candidate, &cert)?)
        };
        let key = match &prior {
            Some((_, prior_cert)) => &prior_cert.public_key,
            None => &cert.public_key,
        };
        verify_digest(key, &cert.head_digest(), &cert.latest_signed_head).map_err(|fault| match fault {
            SignatureFault::MalformedKey => RejectReason::InvalidKey,
            SignatureFault::MalformedSignature | SignatureFault::Mismatch => RejectReason::InvalidSignature,
        })?;

        match prior {
            None => Ok(()),
            Some((prior_block, prior_cert)) => self.spend(candidate, &cert, &prior_block, &prior_cert),
        }
    }

    fn spend(
        &self,
        candidate: &LedgerBlock,
        cert: &CertBlock,
        prior_block: &LedgerBlock,
        prior_cert: &CertBlock,
    ) -> Result<(), RejectReason> {
        let spent = match self.index.try_spend(&cert.prev_head_digest, candidate.handle()) {
            Err(SpendError::Unknown) => {
                self.index.apply(&IndexDelta::admitted(prior_cert, prior_block.handle()));
                debug!(
                    digest = %cert.prev_head_digest.short(),
                    block = %prior_block.id,
                    "predecessor head reconciled from ledger"
                );
                self.index.try_spend(&cert.prev_head_digest, candidate.handle())
            }
            other => other,
        };
        match spent {
            Ok(_) => Ok(()),
            Err(SpendError::AlreadySpent { .. }) => Err(RejectReason::SpentPredecessor),
            Err(SpendError::Unknown) => Err(RejectReason::UnknownPredecessorDigest),
        }
    }

    /// The admitted block the candidate's back link points at, and its
    /// CertBlock. Its head digest must be the one the candidate consumes.
    fn predecessor(&self, candidate: &LedgerBlock, cert: &CertBlock) -> Result<(LedgerBlock, CertBlock), RejectReason> {
        let back = candidate.back_link.ok_or(RejectReason::MissingBackLink)?;
        let prior = match self.chain.block(&back) {
            Ok(Some(block)) => block,
            Ok(None) => return Err(RejectReason::UnknownPredecessor),
            Err(e) => {
                warn!(block = %back, error = %e, "predecessor lookup failed");
                return Err(RejectReason::UnknownPredecessor);
            }
        };
        let prior_cert = prior.cert_block().map_err(|_| RejectReason::BrokenChain)?;
        if prior_cert.latest_head_digest != cert.prev_head_digest {
            return Err(RejectReason::BrokenChain);
        }
        Ok((prior, prior_cert))
    }
}

impl BlockVerifier for VerificationEngine {
    fn verifier_id(&self) -> VerifierId {
        self.id
    }

    fn verify(&self, candidate_id: &BlockId, candidate: &LedgerBlock) -> Verdict {
        if *candidate_id != candidate.id {
            warn!(claimed = %candidate_id, actual = %candidate.id, "candidate id mismatch");
            return Verdict::Rejected(RejectReason::Malformed);
        }
        self.evaluate(candidate)
    }

    fn release(&self, candidate: &LedgerBlock) {
        let Ok(cert) = candidate.cert_block() else {
            return;
        };
        if cert.is_genesis() {
            return;
        }
        if self.index.release(&cert.prev_head_digest, candidate.handle()) {
            debug!(block = %candidate.id, "released predecessor reservation");
        }
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger-facing types: admitted blocks, the read seam, and the verifier
//! callback contract.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::block::CertBlock;
use crate::error::{ChainError, PayloadError};
use crate::types::{hex_bytes, BlockHandle, BlockId, Digest, Roster, VerifierId};

/// A block as the ledger stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBlock {
    pub index: u64,
    pub id: BlockId,
    /// `None` only for a chain's genesis block.
    pub back_link: Option<BlockId>,
    pub genesis: BlockId,
    pub verifier: VerifierId,
    pub roster: Roster,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl LedgerBlock {
    /// Content address over everything but the id itself.
    pub fn compute_id(
        index: u64,
        back_link: Option<&BlockId>,
        verifier: &VerifierId,
        roster: &Roster,
        data: &[u8],
    ) -> BlockId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&index.to_le_bytes());
        match back_link {
            Some(id) => {
                hasher.update(&[1]);
                hasher.update(id.0.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(verifier.0.as_bytes());
        hasher.update(&(roster.len() as u32).to_le_bytes());
        for member in roster.iter() {
            hasher.update(&(member.address.len() as u32).to_le_bytes());
            hasher.update(member.address.as_bytes());
        }
        hasher.update(&(data.len() as u64).to_le_bytes());
        hasher.update(data);
        BlockId(Digest::from(hasher.finalize()))
    }

    pub fn genesis(roster: Roster, verifier: VerifierId, data: Vec<u8>) -> Self {
        let id = Self::compute_id(0, None, &verifier, &roster, &data);
        Self {
            index: 0,
            id,
            back_link: None,
            genesis: id,
            verifier,
            roster,
            data,
        }
    }

    /// Candidate that extends `prior`; it inherits the chain's roster.
    pub fn successor(prior: &LedgerBlock, verifier: VerifierId, data: Vec<u8>) -> Self {
        let index = prior.index + 1;
        let id = Self::compute_id(index, Some(&prior.id), &verifier, &prior.roster, &data);
        Self {
            index,
            id,
            back_link: Some(prior.id),
            genesis: prior.genesis,
            verifier,
            roster: prior.roster.clone(),
            data,
        }
    }

    pub fn handle(&self) -> BlockHandle {
        BlockHandle {
            index: self.index,
            id: self.id,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.back_link.is_none()
    }

    pub fn cert_block(&self) -> Result<CertBlock, PayloadError> {
        CertBlock::from_payload(&self.data)
    }
}

/// Read access to admitted blocks. Only blocks the ledger durably admitted
/// may be returned: verifiers trust them as settled history.
pub trait ChainReader: Send + Sync {
    fn block(&self, id: &BlockId) -> Result<Option<LedgerBlock>, ChainError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Payload does not decode as a CertBlock.
    Malformed,
    VerifierMismatch,
    /// `latest_head_digest != hash(latest_signed_head)`.
    DigestMismatch,
    /// Tree head's previous digest disagrees with the block's.
    HeadLinkMismatch,
    /// Non-genesis CertBlock without a ledger back link.
    MissingBackLink,
    UnknownPredecessor,
    /// Predecessor's head digest is not the one this block points at.
    BrokenChain,
    InvalidKey,
    InvalidSignature,
    SpentPredecessor,
    UnknownPredecessorDigest,
    /// Block content already admitted.
    Replay,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Malformed => "malformed",
            RejectReason::VerifierMismatch => "verifier_mismatch",
            RejectReason::DigestMismatch => "digest_mismatch",
            RejectReason::HeadLinkMismatch => "head_link_mismatch",
            RejectReason::MissingBackLink => "missing_back_link",
            RejectReason::UnknownPredecessor => "unknown_predecessor",
            RejectReason::BrokenChain => "broken_chain",
            RejectReason::InvalidKey => "invalid_key",
            RejectReason::InvalidSignature => "invalid_signature",
            RejectReason::SpentPredecessor => "spent_predecessor",
            RejectReason::UnknownPredecessorDigest => "unknown_predecessor_digest",
            RejectReason::Replay => "replay",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Callback the ledger runs before admitting a candidate.
pub trait BlockVerifier: Send + Sync {
    fn verifier_id(&self) -> VerifierId;

    fn verify(&self, candidate_id: &BlockId, candidate: &LedgerBlock) -> Verdict;

    /// Undo side effects of an accepted verdict when the ledger ends up not
    /// admitting the candidate.
    fn release(&self, _candidate: &LedgerBlock) {}
}

/// Hash-map backed [`ChainReader`].
#[derive(Debug, Default)]
pub struct MemoryChain {
    blocks: RwLock<HashMap<BlockId, LedgerBlock>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a block with the same id is already present.
    pub fn insert(&self, block: LedgerBlock) -> bool {
        let mut blocks = self.blocks.write();
        if blocks.contains_key(&block.id) {
            return false;
        }
        blocks.insert(block.id, block);
        true
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn get(&self, id: &BlockId) -> Option<LedgerBlock> {
        self.blocks.read().get(id).cloned()
    }

    /// All blocks, ordered by (genesis, index).
    pub fn blocks(&self) -> Vec<LedgerBlock> {
        let mut out: Vec<LedgerBlock> = self.blocks.read().values().cloned().collect();
        out.sort_by(|a, b| (a.genesis, a.index).cmp(&(b.genesis, b.index)));
        out
    }
}

impl ChainReader for MemoryChain {
    fn block(&self, id: &BlockId) -> Result<Option<LedgerBlock>, ChainError> {
        Ok(self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{certchain_verifier, ServerIdentity};

    fn roster() -> Roster {
        Roster::new(vec![ServerIdentity::new("n1", "http://127.0.0.1:1")])
    }

    #[test]
    fn successor_links_and_inherits() {
        let g = LedgerBlock::genesis(roster(), certchain_verifier(), vec![1]);
        assert!(g.is_genesis());
        assert_eq!(g.genesis, g.id);

        let s = LedgerBlock::successor(&g, certchain_verifier(), vec![2]);
        assert_eq!(s.index, 1);
        assert_eq!(s.back_link, Some(g.id));
        assert_eq!(s.genesis, g.id);
        assert_eq!(s.roster, g.roster);
        assert_ne!(s.id, g.id);

        let clone = LedgerBlock::successor(&g, certchain_verifier(), vec![2]);
        assert_eq!(clone.id, s.id);
    }

    #[test]
    fn memory_chain_refuses_duplicates() {
        let chain = MemoryChain::new();
        let g = LedgerBlock::genesis(roster(), certchain_verifier(), vec![1]);
        assert!(chain.insert(g.clone()));
        assert!(!chain.insert(g.clone()));
        assert_eq!(chain.block(&g.id).unwrap(), Some(g));
    }

    #[test]
    fn reject_reason_serializes_snake_case() {
        let json = serde_json::to_string(&RejectReason::SpentPredecessor).unwrap();
        assert_eq!(json, "\"spent_predecessor\"");
    }
}

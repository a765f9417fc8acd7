// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Unspent-tip index.
//!
//! Each node keeps the set of head digests that no admitted block has
//! consumed yet. The set is a two-phase set: a digest that was ever spent
//! keeps a tombstone and can never become unspent again. That makes
//! [`UnspentIndex::apply`] commutative and idempotent, so deltas may arrive
//! in any order, more than once.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::block::CertBlock;
use crate::types::{BlockHandle, Digest};

/// Index update emitted when a block is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDelta {
    /// Digest that becomes a chain tip.
    pub head_digest: Digest,
    /// Digest the block consumed; `None` for genesis.
    pub spent_digest: Option<Digest>,
    pub block: BlockHandle,
}

impl IndexDelta {
    pub fn admitted(cert: &CertBlock, block: BlockHandle) -> Self {
        Self {
            head_digest: cert.latest_head_digest,
            spent_digest: (!cert.is_genesis()).then_some(cert.prev_head_digest),
            block,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendError {
    AlreadySpent { by: BlockHandle },
    Unknown,
}

#[derive(Debug, Clone, Copy)]
struct Spend {
    /// Block that produced the digest, when this node knew it.
    producer: Option<BlockHandle>,
    consumer: BlockHandle,
}

#[derive(Debug, Default)]
struct IndexState {
    unspent: FxHashMap<Digest, BlockHandle>,
    spent: FxHashMap<Digest, Spend>,
}

#[derive(Debug, Default)]
pub struct UnspentIndex {
    state: Mutex<IndexState>,
}

impl UnspentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a delta. Returns true if the index changed.
    pub fn apply(&self, delta: &IndexDelta) -> bool {
        let mut state = self.state.lock();
        let mut changed = false;

        if let Some(spent) = delta.spent_digest {
            let producer = state.unspent.remove(&spent);
            changed |= producer.is_some();
            if !state.spent.contains_key(&spent) {
                state.spent.insert(
                    spent,
                    Spend {
                        producer,
                        consumer: delta.block,
                    },
                );
                changed = true;
            }
        }

        if !state.spent.contains_key(&delta.head_digest)
            && !state.unspent.contains_key(&delta.head_digest)
        {
            state.unspent.insert(delta.head_digest, delta.block);
            changed = true;
        }
        changed
    }

    /// Atomically consume `digest` on behalf of `consumer`. Returns the block
    /// that produced it.
    pub fn try_spend(&self, digest: &Digest, consumer: BlockHandle) -> Result<BlockHandle, SpendError> {
        let mut state = self.state.lock();
        if let Some(spend) = state.spent.get(digest) {
            return Err(SpendError::AlreadySpent { by: spend.consumer });
        }
        let producer = state.unspent.remove(digest).ok_or(SpendError::Unknown)?;
        state.spent.insert(
            *digest,
            Spend {
                producer: Some(producer),
                consumer,
            },
        );
        Ok(producer)
    }

    /// Undo a [`try_spend`](Self::try_spend) by `consumer` whose block was
    /// never admitted. Returns true if the digest is unspent again.
    pub fn release(&self, digest: &Digest, consumer: BlockHandle) -> bool {
        let mut state = self.state.lock();
        let producer = match state.spent.get(digest) {
            Some(Spend {
                producer: Some(producer),
                consumer: c,
            }) if *c == consumer => *producer,
            _ => return false,
        };
        state.spent.remove(digest);
        state.unspent.insert(*digest, producer);
        true
    }

    pub fn is_unspent(&self, digest: &Digest) -> bool {
        self.state.lock().unspent.contains_key(digest)
    }

    pub fn is_spent(&self, digest: &Digest) -> bool {
        self.state.lock().spent.contains_key(digest)
    }

    pub fn tip(&self, digest: &Digest) -> Option<BlockHandle> {
        self.state.lock().unspent.get(digest).copied()
    }

    /// Snapshot of all unspent digests, ordered by digest.
    pub fn unspent(&self) -> Vec<(Digest, BlockHandle)> {
        let mut out: Vec<_> = self
            .state
            .lock()
            .unspent
            .iter()
            .map(|(d, h)| (*d, *h))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.state.lock().unspent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

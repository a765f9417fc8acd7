// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Authenticated key/value maps.
//!
//! The builder only talks to [`AuthenticatedMap`]; [`SparseMerkleMap`] is
//! the implementation the node ships with.

pub mod adapter;
pub mod path;
pub mod sparse;

pub use adapter::MapAdapter;
pub use path::{AuthenticationPath, PathLeaf};
pub use sparse::SparseMerkleMap;

use crate::error::MapError;
use crate::types::Digest;

/// A key/value map that commits to its contents with a Merkle root per epoch.
///
/// Writes are staged with [`set`](Self::set) and become visible only when
/// [`recompute_root`](Self::recompute_root) commits them as a new epoch.
pub trait AuthenticatedMap {
    /// Tree position of `key`.
    fn index_of(&self, key: &str) -> Digest;

    /// Stage a write. Rejects an index that does not belong to `key` and a
    /// second write to the same index within one batch.
    fn set(&mut self, index: Digest, key: &str, value: Vec<u8>) -> Result<(), MapError>;

    /// Drop every staged write.
    fn discard_pending(&mut self);

    /// Commit staged writes as the next epoch and return its root.
    fn recompute_root(&mut self) -> Digest;

    fn root(&self) -> Digest;

    /// Number of committed epochs; 0 for a fresh map.
    fn epoch(&self) -> u64;

    /// Number of distinct keys with a committed value.
    fn size(&self) -> u64;

    /// Proof of presence or absence against the current root.
    fn lookup(&self, key: &str) -> AuthenticationPath;

    /// Proof against the root of an earlier epoch. `None` for an epoch that
    /// was never committed.
    fn lookup_at(&self, key: &str, epoch: u64) -> Option<AuthenticationPath>;

    /// Root committed at `epoch`.
    fn root_at(&self, epoch: u64) -> Option<Digest>;

    /// Epoch at which the live value of `key` was written.
    fn inserted_at(&self, key: &str) -> Option<u64>;
}

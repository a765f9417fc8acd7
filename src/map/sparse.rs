// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory sparse Merkle map with per-epoch history.
//!
//! Keys are placed at `keyed_hash(index_key, key)` in a depth-256 binary
//! tree. Every committed value is kept with the epoch it was written in, so
//! paths can be produced against any earlier root.

use std::collections::BTreeMap;

use crate::error::MapError;
use crate::hash::{self, bit_at, empty_subtree, leaf_hash, node_hash, TREE_DEPTH};
use crate::types::Digest;

use super::path::{AuthenticationPath, PathLeaf};
use super::AuthenticatedMap;

#[derive(Debug, Clone)]
struct LeafVersion {
    epoch: u64,
    key: String,
    value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SparseMerkleMap {
    index_key: [u8; 32],
    /// Committed versions per index, ascending by epoch.
    versions: BTreeMap<Digest, Vec<LeafVersion>>,
    pending: BTreeMap<Digest, (String, Vec<u8>)>,
    /// `roots[e]` is the root after epoch `e`; `roots[0]` is the empty tree.
    roots: Vec<Digest>,
}

impl SparseMerkleMap {
    pub fn new(index_key: [u8; 32]) -> Self {
        Self {
            index_key,
            versions: BTreeMap::new(),
            pending: BTreeMap::new(),
            roots: vec![empty_subtree(TREE_DEPTH)],
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn leaf_at(&self, index: &Digest, epoch: u64) -> Option<&LeafVersion> {
        self.versions
            .get(index)?
            .iter()
            .rev()
            .find(|v| v.epoch <= epoch)
    }

    /// (index, leaf hash) of every entry live at `epoch`, ordered by index.
    fn leaves_at(&self, epoch: u64) -> Vec<(Digest, Digest)> {
        self.versions
            .iter()
            .filter_map(|(index, history)| {
                history
                    .iter()
                    .rev()
                    .find(|v| v.epoch <= epoch)
                    .map(|v| (*index, leaf_hash(index, v.epoch, &v.key, &v.value)))
            })
            .collect()
    }

    fn path_at(&self, key: &str, epoch: u64) -> AuthenticationPath {
        let index = self.index_of(key);
        let leaves = self.leaves_at(epoch);
        let leaf = self.leaf_at(&index, epoch).map(|v| PathLeaf {
            key: v.key.clone(),
            value: v.value.clone(),
            epoch: v.epoch,
        });
        AuthenticationPath {
            index,
            lookup_key: key.to_string(),
            epoch,
            leaf,
            siblings: siblings(&leaves, &index),
        }
    }
}

fn subtree_root(leaves: &[(Digest, Digest)], depth: usize) -> Digest {
    if leaves.is_empty() {
        return empty_subtree(TREE_DEPTH - depth);
    }
    if depth == TREE_DEPTH {
        return leaves[0].1;
    }
    let split = leaves.partition_point(|(index, _)| bit_at(index, depth) == 0);
    let left = subtree_root(&leaves[..split], depth + 1);
    let right = subtree_root(&leaves[split..], depth + 1);
    node_hash(&left, &right)
}

fn siblings(leaves: &[(Digest, Digest)], index: &Digest) -> Vec<Digest> {
    let mut out = Vec::with_capacity(TREE_DEPTH);
    let mut slice = leaves;
    for depth in 0..TREE_DEPTH {
        let split = slice.partition_point(|(i, _)| bit_at(i, depth) == 0);
        let (left, right) = slice.split_at(split);
        if bit_at(index, depth) == 0 {
            out.push(subtree_root(right, depth + 1));
            slice = left;
        } else {
            out.push(subtree_root(left, depth + 1));
            slice = right;
        }
    }
    out
}

impl AuthenticatedMap for SparseMerkleMap {
    fn index_of(&self, key: &str) -> Digest {
        hash::index_of(&self.index_key, key)
    }

    fn set(&mut self, index: Digest, key: &str, value: Vec<u8>) -> Result<(), MapError> {
        if index != self.index_of(key) {
            return Err(MapError::IndexMismatch { key: key.to_string() });
        }
        if value.is_empty() {
            return Err(MapError::EmptyValue { key: key.to_string() });
        }
        // Same key again in one batch: the later write wins.
        if let Some((staged, _)) = self.pending.get(&index) {
            if staged != key {
                return Err(MapError::DuplicateIndex { key: key.to_string() });
            }
        }
        self.pending.insert(index, (key.to_string(), value));
        Ok(())
    }

    fn discard_pending(&mut self) {
        self.pending.clear();
    }

    fn recompute_root(&mut self) -> Digest {
        let epoch = self.epoch() + 1;
        for (index, (key, value)) in std::mem::take(&mut self.pending) {
            self.versions
                .entry(index)
                .or_default()
                .push(LeafVersion { epoch, key, value });
        }
        let root = subtree_root(&self.leaves_at(epoch), 0);
        self.roots.push(root);
        root
    }

    fn root(&self) -> Digest {
        self.roots[self.roots.len() - 1]
    }

    fn epoch(&self) -> u64 {
        (self.roots.len() - 1) as u64
    }

    fn size(&self) -> u64 {
        self.versions.len() as u64
    }

    fn lookup(&self, key: &str) -> AuthenticationPath {
        self.path_at(key, self.epoch())
    }

    fn lookup_at(&self, key: &str, epoch: u64) -> Option<AuthenticationPath> {
        if epoch > self.epoch() {
            return None;
        }
        Some(self.path_at(key, epoch))
    }

    fn root_at(&self, epoch: u64) -> Option<Digest> {
        self.roots.get(epoch as usize).copied()
    }

    fn inserted_at(&self, key: &str) -> Option<u64> {
        let index = self.index_of(key);
        self.versions.get(&index)?.last().map(|v| v.epoch)
    }
}

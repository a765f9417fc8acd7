// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Authentication paths.

use serde::{Deserialize, Serialize};

use crate::hash::{bit_at, empty_subtree, leaf_hash, node_hash, TREE_DEPTH};
use crate::types::{hex_bytes, Digest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLeaf {
    pub key: String,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
    /// Epoch the value was written in.
    pub epoch: u64,
}

/// Proof that `lookup_key` maps to `leaf` (or to nothing) under one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationPath {
    pub index: Digest,
    pub lookup_key: String,
    /// Epoch of the root this path authenticates against.
    pub epoch: u64,
    pub leaf: Option<PathLeaf>,
    /// Sibling hashes from the root downwards.
    pub siblings: Vec<Digest>,
}

impl AuthenticationPath {
    pub fn is_presence(&self) -> bool {
        matches!(&self.leaf, Some(leaf) if leaf.key == self.lookup_key)
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.leaf.as_ref().map(|l| l.value.as_slice())
    }

    /// Fold the leaf up through the siblings. `None` if the path is malformed.
    pub fn recompute_root(&self) -> Option<Digest> {
        if self.siblings.len() != TREE_DEPTH {
            return None;
        }
        let mut acc = match &self.leaf {
            Some(leaf) => {
                if leaf.key != self.lookup_key {
                    return None;
                }
                leaf_hash(&self.index, leaf.epoch, &leaf.key, &leaf.value)
            }
            None => empty_subtree(0),
        };
        for depth in (0..TREE_DEPTH).rev() {
            let sibling = &self.siblings[depth];
            acc = if bit_at(&self.index, depth) == 0 {
                node_hash(&acc, sibling)
            } else {
                node_hash(sibling, &acc)
            };
        }
        Some(acc)
    }

    pub fn verify(&self, root: &Digest) -> bool {
        self.recompute_root().as_ref() == Some(root)
    }
}

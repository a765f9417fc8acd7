// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical BLAKE3 hashing.
//!
//! Every digest in CertChain (tree heads, signatures, block ids, map nodes)
//! comes from here. Map hashing is domain separated:
//!
//! ```text
//! leaf  = H(0x00 || index || epoch u64 LE || len(key) u32 LE || key || value)
//! empty = H(0x01)
//! node  = H(0x02 || left || right)
//! ```

use std::sync::OnceLock;

use crate::types::Digest;

const LEAF_PREFIX: u8 = 0x00;
const EMPTY_PREFIX: u8 = 0x01;
const NODE_PREFIX: u8 = 0x02;

/// Number of levels between the root and a leaf.
pub const TREE_DEPTH: usize = 256;

pub fn hash_bytes(data: &[u8]) -> Digest {
    Digest::from(blake3::hash(data))
}

/// Map a lookup key to its tree position under the map's index key.
pub fn index_of(index_key: &[u8; 32], key: &str) -> Digest {
    Digest::from(blake3::keyed_hash(index_key, key.as_bytes()))
}

pub fn leaf_hash(index: &Digest, epoch: u64, key: &str, value: &[u8]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(index.as_bytes());
    hasher.update(&epoch.to_le_bytes());
    hasher.update(&(key.len() as u32).to_le_bytes());
    hasher.update(key.as_bytes());
    hasher.update(value);
    Digest::from(hasher.finalize())
}

pub fn node_hash(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Digest::from(hasher.finalize())
}

/// Root of an empty subtree of the given height (0 = an empty leaf).
pub fn empty_subtree(height: usize) -> Digest {
    static EMPTY: OnceLock<Vec<Digest>> = OnceLock::new();
    let table = EMPTY.get_or_init(|| {
        let mut table = Vec::with_capacity(TREE_DEPTH + 1);
        table.push(hash_bytes(&[EMPTY_PREFIX]));
        for h in 1..=TREE_DEPTH {
            let below = table[h - 1];
            table.push(node_hash(&below, &below));
        }
        table
    });
    table[height.min(TREE_DEPTH)]
}

/// Bit of `index` at `depth`, most significant bit first.
#[inline]
pub fn bit_at(index: &Digest, depth: usize) -> u8 {
    (index.0[depth / 8] >> (7 - (depth % 8))) & 1
}

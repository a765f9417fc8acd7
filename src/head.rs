// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Signed tree heads.

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;
use crate::hash::hash_bytes;
use crate::types::Digest;

pub const TREE_HEAD_VERSION: u16 = 1;

/// Commitment to the map after one epoch.
///
/// The serialized bytes are what gets hashed and signed, so they are
/// produced with a fixed bincode configuration and never re-encoded by
/// verifiers: a verifier hashes the bytes it received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeHead {
    pub version: u16,
    pub epoch: u64,
    pub root: Digest,
    pub size: u64,
    /// Signature digest of the previous accepted head (ZERO for genesis).
    pub prev_head_digest: Digest,
}

impl TreeHead {
    pub fn new(epoch: u64, root: Digest, size: u64, prev_head_digest: Digest) -> Self {
        Self {
            version: TREE_HEAD_VERSION,
            epoch,
            root,
            size,
            prev_head_digest,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| PayloadError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        let (head, read): (TreeHead, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| PayloadError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(PayloadError::TrailingBytes(bytes.len() - read));
        }
        if head.version != TREE_HEAD_VERSION {
            return Err(PayloadError::UnsupportedHeadVersion(head.version));
        }
        Ok(head)
    }

    pub fn digest(&self) -> Result<Digest, PayloadError> {
        Ok(hash_bytes(&self.encode()?))
    }
}

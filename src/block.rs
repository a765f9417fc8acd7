// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! CertBlocks, certificates and the ledger payload codec.
//!
//! Payload layout (what a ledger block's `data` field carries):
//!
//! ```text
//! [magic "CERT" (4)][version u8][kind u8][reserved (2)][bincode body]
//! ```

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;
use crate::hash::hash_bytes;
use crate::head::TreeHead;
use crate::types::{hex_bytes, Digest};

pub const PAYLOAD_MAGIC: [u8; 4] = *b"CERT";
pub const PAYLOAD_VERSION: u8 = 1;
pub const PAYLOAD_HEADER_LEN: usize = 8;

pub const KIND_CERT_BLOCK: u8 = 1;

/// Size of the random blobs produced by [`random_certificates`].
pub const RANDOM_CERT_LEN: usize = 32;

/// An issued certificate: the identity it names and its opaque DER bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub identity: String,
    #[serde(with = "hex_bytes")]
    pub der: Vec<u8>,
}

impl Certificate {
    pub fn new(identity: impl Into<String>, der: Vec<u8>) -> Self {
        Self {
            identity: identity.into(),
            der,
        }
    }
}

/// One random certificate per identity, for tests and demos.
pub fn random_certificates<R: RngCore>(rng: &mut R, identities: &[&str]) -> Vec<Certificate> {
    identities
        .iter()
        .map(|identity| {
            let mut der = vec![0u8; RANDOM_CERT_LEN];
            rng.fill_bytes(&mut der);
            Certificate::new(*identity, der)
        })
        .collect()
}

/// The unit a CA lineage appends to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertBlock {
    /// Ed25519 signature over `hash(latest_head)`.
    #[serde(with = "hex_bytes")]
    pub latest_signed_head: Vec<u8>,
    /// `hash(latest_signed_head)`; this is the value successors point at.
    pub latest_head_digest: Digest,
    /// ZERO for genesis.
    pub prev_head_digest: Digest,
    /// Serialized [`TreeHead`].
    #[serde(with = "hex_bytes")]
    pub latest_head: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
}

impl CertBlock {
    pub fn is_genesis(&self) -> bool {
        self.prev_head_digest.is_zero()
    }

    /// Checks `latest_head_digest == hash(latest_signed_head)`.
    pub fn verify_digest(&self) -> bool {
        hash_bytes(&self.latest_signed_head) == self.latest_head_digest
    }

    /// Digest of the serialized head, i.e. the message that was signed.
    pub fn head_digest(&self) -> Digest {
        hash_bytes(&self.latest_head)
    }

    pub fn head(&self) -> Result<TreeHead, PayloadError> {
        TreeHead::decode(&self.latest_head)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        let body = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| PayloadError::Encode(e.to_string()))?;
        let mut out = Vec::with_capacity(PAYLOAD_HEADER_LEN + body.len());
        out.extend_from_slice(&PAYLOAD_MAGIC);
        out.push(PAYLOAD_VERSION);
        out.push(KIND_CERT_BLOCK);
        out.extend_from_slice(&[0u8; 2]);
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn from_payload(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.len() < PAYLOAD_HEADER_LEN {
            return Err(PayloadError::TooShort(bytes.len()));
        }
        if bytes[0..4] != PAYLOAD_MAGIC {
            return Err(PayloadError::InvalidMagic);
        }
        if bytes[4] != PAYLOAD_VERSION {
            return Err(PayloadError::UnsupportedVersion(bytes[4]));
        }
        if bytes[5] != KIND_CERT_BLOCK {
            return Err(PayloadError::UnexpectedKind(bytes[5]));
        }

        let body = &bytes[PAYLOAD_HEADER_LEN..];
        let (block, read): (CertBlock, usize) =
            bincode::serde::decode_from_slice(body, bincode::config::standard())
                .map_err(|e| PayloadError::Decode(e.to_string()))?;
        if read != body.len() {
            return Err(PayloadError::TrailingBytes(body.len() - read));
        }
        Ok(block)
    }
}

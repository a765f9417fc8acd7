// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ed25519 signing of tree-head digests.

use core::fmt;

use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use ed25519_dalek::Signer as _;
use rand::{CryptoRng, RngCore};

use crate::error::BuildError;
use crate::types::Digest;

pub const PUBLIC_KEY_LEN: usize = 32;

/// Holds the private key that signs a lineage's tree heads.
///
/// There is no process-wide key: every builder owns the signer it was given.
pub struct Signer {
    key: SigningKey,
}

impl Signer {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self {
            key: SigningKey::generate(rng),
        }
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.key.verifying_key().to_bytes()
    }

    pub fn sign_digest(&self, digest: &Digest) -> Result<Vec<u8>, BuildError> {
        let signature = self
            .key
            .try_sign(digest.as_bytes())
            .map_err(|e| BuildError::Signing(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFault {
    MalformedKey,
    MalformedSignature,
    Mismatch,
}

/// Strict Ed25519 verification of `signature` over `digest`.
pub fn verify_digest(public_key: &[u8], digest: &Digest, signature: &[u8]) -> Result<(), SignatureFault> {
    let key_bytes: [u8; PUBLIC_KEY_LEN] = public_key
        .try_into()
        .map_err(|_| SignatureFault::MalformedKey)?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| SignatureFault::MalformedKey)?;
    let signature = Signature::from_slice(signature).map_err(|_| SignatureFault::MalformedSignature)?;
    key.verify_strict(digest.as_bytes(), &signature)
        .map_err(|_| SignatureFault::Mismatch)
}

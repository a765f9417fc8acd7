// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types.

use core::fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Digest;

/// Ledger-assigned identifier of an admitted block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub Digest);

impl BlockId {
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Digest::from_hex(s).map(BlockId)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({}..)", self.0.short())
    }
}

/// Position of a block in its ledger chain plus its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHandle {
    pub index: u64,
    pub id: BlockId,
}

/// Names the verification function a ledger chain is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifierId(pub Uuid);

impl VerifierId {
    /// Deterministic id derived from a name, so every node computes the same value.
    pub fn named(name: &str) -> Self {
        VerifierId(Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()))
    }
}

impl fmt::Display for VerifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

pub const CERTCHAIN_VERIFIER_NAME: &str = "CertChain";

pub fn certchain_verifier() -> VerifierId {
    VerifierId::named(CERTCHAIN_VERIFIER_NAME)
}

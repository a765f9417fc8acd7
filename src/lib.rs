// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! certchain: certificate-transparency lineages on top of a replicated ledger.
//!
//! A CA lineage batches certificates into an authenticated map, signs the
//! resulting tree head, and appends it to the ledger as a [`block::CertBlock`].
//! Every node runs the [`engine::VerificationEngine`] on candidate blocks so
//! that each head is consumed by at most one successor.

pub mod block;
pub mod builder;
pub mod engine;
pub mod error;
pub mod hash;
pub mod head;
pub mod inclusion;
pub mod ledger;
pub mod map;
pub mod signer;
pub mod types;
pub mod unspent;

pub use block::{random_certificates, CertBlock, Certificate};
pub use builder::CertBlockBuilder;
pub use engine::VerificationEngine;
pub use error::{BuildError, ChainError, MapError, PayloadError, ProofError};
pub use head::TreeHead;
pub use inclusion::{anchors, verify_inclusion};
pub use ledger::{BlockVerifier, ChainReader, LedgerBlock, MemoryChain, RejectReason, Verdict};
pub use map::{AuthenticatedMap, AuthenticationPath, SparseMerkleMap};
pub use signer::Signer;
pub use types::{BlockHandle, BlockId, Digest, Roster, ServerIdentity, VerifierId};
pub use unspent::{IndexDelta, UnspentIndex};

#[cfg(test)]
pub mod tests;

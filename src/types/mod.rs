// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared value types: digests, identifiers, rosters.

pub mod digest;
pub mod hex_bytes;
pub mod id;
pub mod roster;

pub use digest::{Digest, DIGEST_LEN};
pub use id::{certchain_verifier, BlockHandle, BlockId, VerifierId, CERTCHAIN_VERIFIER_NAME};
pub use roster::{Roster, ServerIdentity};

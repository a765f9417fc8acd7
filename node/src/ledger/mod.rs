// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger service seam and the in-process reference ledger.

pub mod block_log;
pub mod local;

use std::sync::Arc;

use certchain::{BlockId, BlockVerifier, ChainError, ChainReader, LedgerBlock, RejectReason, Roster, ServerIdentity, VerifierId};
use thiserror::Error;

pub use block_log::{BlockLogError, BlockLogWriter};
pub use local::LocalLedger;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("block rejected: {0}")]
    Rejected(RejectReason),

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("no registered verifier {0} in the chain roster")]
    NoVerifier(VerifierId),

    #[error("block log append failed for {candidate}: {source}")]
    Storage {
        candidate: BlockId,
        #[source]
        source: BlockLogError,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// A replicated, append-only block store.
///
/// Candidates are admitted only after every registered roster member whose
/// verifier matches the chain accepts them.
pub trait LedgerService: ChainReader {
    /// Register `member`'s verification callback.
    fn register_verifier(&self, member: ServerIdentity, verifier: Arc<dyn BlockVerifier>);

    fn create_genesis(&self, roster: &Roster, verifier: VerifierId, data: Vec<u8>) -> Result<LedgerBlock, LedgerError>;

    /// Append a block whose back link is `prior`.
    fn store(&self, prior: &BlockId, verifier: VerifierId, data: Vec<u8>) -> Result<LedgerBlock, LedgerError>;

    /// Every admitted block, in admission order.
    fn blocks(&self) -> Vec<LedgerBlock>;
}

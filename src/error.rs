// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

use crate::types::BlockId;

/// Failures decoding or encoding ledger payloads and tree heads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload too short: {0} bytes")]
    TooShort(usize),
    #[error("invalid payload magic")]
    InvalidMagic,
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u8),
    #[error("unexpected payload kind {0}")]
    UnexpectedKind(u8),
    #[error("unsupported tree head version {0}")]
    UnsupportedHeadVersion(u16),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

/// Rejections raised by an authenticated map while staging writes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("index does not belong to key {key}")]
    IndexMismatch { key: String },
    #[error("index of key {key} already staged for another key")]
    DuplicateIndex { key: String },
    #[error("empty value for key {key}")]
    EmptyValue { key: String },
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("certificate batch is empty")]
    EmptyBatch,
    #[error("map rejected batch: {0}")]
    Map(#[from] MapError),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("signer rotation needs an accepted genesis block")]
    RotationBeforeGenesis,
}

/// Both variants mean "no provable entry for this identity".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("identity {identity} has no live entry")]
    NotFound { identity: String },
    #[error("authentication path index does not match identity {identity}")]
    IndexMismatch { identity: String },
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    #[error("block {0} referenced but missing from ledger")]
    MissingBlock(BlockId),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Locating the ledger block whose tree head anchors an authentication path.

use crate::error::{ChainError, PayloadError};
use crate::ledger::{ChainReader, LedgerBlock};
use crate::map::AuthenticationPath;
use crate::types::{BlockHandle, Digest};

/// True if `block`'s tree head commits to `root` at `epoch`.
pub fn block_anchors(root: &Digest, epoch: u64, block: &LedgerBlock) -> Result<bool, PayloadError> {
    let head = block.cert_block()?.head()?;
    Ok(head.epoch == epoch && head.root == *root)
}

/// True if `path` proves presence under the tree head carried by `block`.
pub fn anchors(path: &AuthenticationPath, block: &LedgerBlock) -> Result<bool, PayloadError> {
    if !path.is_presence() {
        return Ok(false);
    }
    match path.recompute_root() {
        Some(root) => block_anchors(&root, path.epoch, block),
        None => Ok(false),
    }
}

/// Walk back links from `tip` until a block anchors `path`.
///
/// `Ok(None)` when the walk reaches genesis without a match, or when the path
/// is not a well-formed presence proof.
pub fn verify_inclusion<C: ChainReader + ?Sized>(
    chain: &C,
    path: &AuthenticationPath,
    tip: &LedgerBlock,
) -> Result<Option<BlockHandle>, ChainError> {
    if !path.is_presence() {
        return Ok(None);
    }
    let Some(root) = path.recompute_root() else {
        return Ok(None);
    };

    let mut current = tip.clone();
    loop {
        if block_anchors(&root, path.epoch, &current)? {
            return Ok(Some(current.handle()));
        }
        let Some(back) = current.back_link else {
            return Ok(None);
        };
        current = chain.block(&back)?.ok_or(ChainError::MissingBlock(back))?;
    }
}

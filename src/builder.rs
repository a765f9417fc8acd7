// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Turns certificate batches into signed CertBlocks.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::block::{CertBlock, Certificate};
use crate::error::{BuildError, ProofError};
use crate::hash::hash_bytes;
use crate::map::{AuthenticatedMap, AuthenticationPath, MapAdapter, SparseMerkleMap};
use crate::signer::Signer;
use crate::types::Digest;

/// One CA lineage: a signer, its authenticated map and the last head the
/// ledger accepted.
///
/// `build` links each new block to the last *accepted* head, so a block that
/// the ledger refused never becomes a predecessor.
#[derive(Debug)]
pub struct CertBlockBuilder<M = SparseMerkleMap> {
    signer: Signer,
    /// Key announced by the next block, installed once that block is accepted.
    incoming: Option<Signer>,
    adapter: MapAdapter<M>,
    accepted_tip: Digest,
    /// Map epochs carried by accepted blocks.
    anchored: BTreeSet<u64>,
}

impl<M: AuthenticatedMap> CertBlockBuilder<M> {
    pub fn new(signer: Signer, map: M) -> Self {
        Self {
            signer,
            incoming: None,
            adapter: MapAdapter::new(map),
            accepted_tip: Digest::ZERO,
            anchored: BTreeSet::new(),
        }
    }

    pub fn build(&mut self, batch: &[Certificate]) -> Result<CertBlock, BuildError> {
        if batch.is_empty() {
            return Err(BuildError::EmptyBatch);
        }
        self.adapter.insert_batch(batch)?;

        let head = self.adapter.commit(self.accepted_tip);
        let latest_head = head.encode()?;
        let latest_signed_head = self.signer.sign_digest(&hash_bytes(&latest_head))?;
        let block = CertBlock {
            latest_head_digest: hash_bytes(&latest_signed_head),
            latest_signed_head,
            prev_head_digest: self.accepted_tip,
            latest_head,
            public_key: self.announced_key().to_vec(),
        };

        debug!(
            epoch = head.epoch,
            size = head.size,
            digest = %block.latest_head_digest.short(),
            genesis = block.is_genesis(),
            "built cert block"
        );
        Ok(block)
    }

    /// Record that the ledger admitted `block`; the next build links to it.
    pub fn accept(&mut self, block: &CertBlock) {
        self.accepted_tip = block.latest_head_digest;
        match block.head() {
            Ok(head) => {
                self.anchored.insert(head.epoch);
            }
            Err(e) => warn!(error = %e, "accepted block carries no readable tree head"),
        }
        let handover = matches!(&self.incoming, Some(next) if next.public_key()[..] == block.public_key[..]);
        if handover {
            if let Some(next) = self.incoming.take() {
                debug!(key = %hex::encode(next.public_key()), "signer rotated");
                self.signer = next;
            }
        }
    }

    pub fn accepted_tip(&self) -> Digest {
        self.accepted_tip
    }

    /// Hand over to a new key. Successors are verified under the key their
    /// predecessor announced, so the next block is still signed by the
    /// current key but announces `signer`; after the ledger accepts it,
    /// `signer` signs every later block.
    ///
    /// A genesis block is verified under the key it carries, so there is
    /// nothing to hand over from until one has been accepted.
    pub fn rotate_signer(&mut self, signer: Signer) -> Result<(), BuildError> {
        if self.accepted_tip == Digest::ZERO {
            return Err(BuildError::RotationBeforeGenesis);
        }
        self.incoming = Some(signer);
        Ok(())
    }

    /// Key signing the next block.
    pub fn public_key(&self) -> [u8; 32] {
        self.signer.public_key()
    }

    fn announced_key(&self) -> [u8; 32] {
        match &self.incoming {
            Some(next) => next.public_key(),
            None => self.signer.public_key(),
        }
    }

    /// Path for `identity` against the first accepted head holding its
    /// live value, so blocks the ledger refused never anchor a proof.
    pub fn prove(&self, identity: &str) -> Result<AuthenticationPath, ProofError> {
        self.adapter.prove(identity, &self.anchored)
    }

    pub fn lookup(&self, identity: &str) -> AuthenticationPath {
        self.adapter.lookup(identity)
    }

    pub fn map(&self) -> &M {
        self.adapter.map()
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Bridges certificate batches onto an [`AuthenticatedMap`].

use std::collections::BTreeSet;

use crate::block::Certificate;
use crate::error::{MapError, ProofError};
use crate::head::TreeHead;
use crate::types::Digest;

use super::{AuthenticatedMap, AuthenticationPath};

#[derive(Debug)]
pub struct MapAdapter<M> {
    map: M,
}

impl<M: AuthenticatedMap> MapAdapter<M> {
    pub fn new(map: M) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Stage one write per certificate. On the first rejection every staged
    /// write of this batch is dropped.
    pub fn insert_batch(&mut self, batch: &[Certificate]) -> Result<(), MapError> {
        for cert in batch {
            let index = self.map.index_of(&cert.identity);
            if let Err(e) = self.map.set(index, &cert.identity, cert.der.clone()) {
                self.map.discard_pending();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Commit the staged batch and describe the new epoch.
    pub fn commit(&mut self, prev_head_digest: Digest) -> TreeHead {
        let root = self.map.recompute_root();
        TreeHead::new(self.map.epoch(), root, self.map.size(), prev_head_digest)
    }

    /// Presence path for `identity`, against the first epoch in `anchored`
    /// that carries its live value. Falls back to the epoch the value was
    /// written in when no anchored epoch carries it yet.
    pub fn prove(&self, identity: &str, anchored: &BTreeSet<u64>) -> Result<AuthenticationPath, ProofError> {
        let not_found = || ProofError::NotFound {
            identity: identity.to_string(),
        };
        let written = self.map.inserted_at(identity).ok_or_else(not_found)?;
        let epoch = anchored.range(written..).next().copied().unwrap_or(written);
        let path = self.map.lookup_at(identity, epoch).ok_or_else(not_found)?;
        if path.index != self.map.index_of(identity) {
            return Err(ProofError::IndexMismatch {
                identity: identity.to_string(),
            });
        }
        if !path.is_presence() {
            return Err(not_found());
        }
        Ok(path)
    }

    pub fn lookup(&self, identity: &str) -> AuthenticationPath {
        self.map.lookup(identity)
    }
}

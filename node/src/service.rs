// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Node-side CertChain service: admission through the ledger, local index
//! updates and delta propagation.

use std::sync::Arc;
use std::time::Instant;

use certchain::{BlockId, BlockVerifier, CertBlock, ChainReader, IndexDelta, LedgerBlock, Roster, ServerIdentity, UnspentIndex, VerificationEngine};
use tracing::{error, info, warn};

use crate::api::{AppendBlockRequest, CreateChainRequest, UnspentTip};
use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::ledger::{LedgerError, LedgerService, LocalLedger};
use crate::propagation::Propagator;

pub type SharedService = Arc<CertChainService>;

pub struct CertChainService {
    identity: ServerIdentity,
    ledger: Arc<dyn LedgerService>,
    engine: Arc<VerificationEngine>,
    propagator: Propagator,
}

impl CertChainService {
    /// Build a node on `ledger` and register its verifier there.
    pub fn new(identity: ServerIdentity, ledger: Arc<LocalLedger>, propagator: Propagator) -> Self {
        let engine = Arc::new(VerificationEngine::new(ledger.clone()));
        ledger.register_verifier(identity.clone(), engine.clone());
        Self {
            identity,
            ledger,
            engine,
            propagator,
        }
    }

    pub fn from_config(cfg: &NodeConfig, ledger: Arc<LocalLedger>) -> Self {
        let propagator = Propagator::new(cfg.propagate_timeout, cfg.auth_token.clone());
        Self::new(cfg.identity(), ledger, propagator)
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn index(&self) -> &UnspentIndex {
        self.engine.index()
    }

    /// Rebuild the unspent index from every block the ledger holds.
    pub fn rebuild_index(&self) -> usize {
        let mut applied = 0;
        for block in self.ledger.blocks() {
            if block.verifier != self.engine.verifier_id() {
                continue;
            }
            match block.cert_block() {
                Ok(cert) => {
                    self.index().apply(&IndexDelta::admitted(&cert, block.handle()));
                    applied += 1;
                }
                Err(e) => warn!(block = %block.id, error = %e, "skipping undecodable block"),
            }
        }
        metrics::gauge!("certchain_unspent_tips", self.index().len() as f64);
        info!(applied, tips = self.index().len(), "unspent index rebuilt");
        applied
    }

    pub async fn create_chain(&self, req: CreateChainRequest) -> Result<(LedgerBlock, usize), NodeError> {
        if req.roster.is_empty() {
            return Err(NodeError::InvalidInput("roster is empty".into()));
        }
        let data = req
            .block
            .to_payload()
            .map_err(|e| NodeError::InvalidInput(e.to_string()))?;

        let started = Instant::now();
        let ledger = self.ledger.clone();
        let roster = req.roster.clone();
        let verifier = self.engine.verifier_id();
        let admitted = tokio::task::spawn_blocking(move || ledger.create_genesis(&roster, verifier, data)).await;
        let block = self.settle(admitted, started)?;

        let acks = self.admitted(&req.roster, &req.block, &block).await;
        Ok((block, acks))
    }

    pub async fn append_block(&self, req: AppendBlockRequest) -> Result<(LedgerBlock, usize), NodeError> {
        let data = req
            .block
            .to_payload()
            .map_err(|e| NodeError::InvalidInput(e.to_string()))?;

        let started = Instant::now();
        let ledger = self.ledger.clone();
        let prior = req.prior.id;
        let verifier = self.engine.verifier_id();
        let admitted = tokio::task::spawn_blocking(move || ledger.store(&prior, verifier, data)).await;
        let block = self.settle(admitted, started)?;

        let acks = self.admitted(&block.roster, &req.block, &block).await;
        Ok((block, acks))
    }

    fn settle(
        &self,
        admitted: Result<Result<LedgerBlock, LedgerError>, tokio::task::JoinError>,
        started: Instant,
    ) -> Result<LedgerBlock, NodeError> {
        let result = admitted.map_err(|e| {
            error!(error = %e, "ledger task failed");
            NodeError::Internal
        })?;
        metrics::histogram!("certchain_admission_duration_seconds", started.elapsed().as_secs_f64());
        match result {
            Ok(block) => {
                metrics::counter!("certchain_blocks_accepted_total", 1);
                Ok(block)
            }
            Err(e) => {
                if let LedgerError::Rejected(reason) = &e {
                    metrics::counter!("certchain_blocks_rejected_total", 1, "reason" => reason.as_str());
                }
                warn!(error = %e, "admission failed");
                Err(e.into())
            }
        }
    }

    async fn admitted(&self, roster: &Roster, cert: &CertBlock, block: &LedgerBlock) -> usize {
        let delta = IndexDelta::admitted(cert, block.handle());
        self.apply_delta(&delta);
        info!(
            block = %block.id,
            index = block.index,
            digest = %delta.head_digest.short(),
            genesis = cert.is_genesis(),
            "cert block admitted"
        );
        self.propagator.propagate(roster, &delta).await
    }

    pub fn apply_delta(&self, delta: &IndexDelta) -> bool {
        let changed = self.index().apply(delta);
        metrics::gauge!("certchain_unspent_tips", self.index().len() as f64);
        changed
    }

    /// Apply a delta received from a peer. It must describe a block the
    /// ledger holds; index tombstones are permanent, so anything else is
    /// refused.
    pub fn receive_delta(&self, delta: &IndexDelta) -> Result<bool, NodeError> {
        let block = self.block(&delta.block.id)?;
        let matches = block.verifier == self.engine.verifier_id()
            && block
                .cert_block()
                .map(|cert| IndexDelta::admitted(&cert, block.handle()) == *delta)
                .unwrap_or(false);
        if !matches {
            warn!(block = %delta.block.id, digest = %delta.head_digest.short(), "delta disagrees with ledger block");
            return Err(NodeError::InvalidInput(format!("delta does not match block {}", delta.block.id)));
        }
        Ok(self.apply_delta(delta))
    }

    pub fn block(&self, id: &BlockId) -> Result<LedgerBlock, NodeError> {
        self.ledger
            .block(id)
            .map_err(|e| NodeError::Storage(e.to_string()))?
            .ok_or_else(|| NodeError::NotFound(format!("block {}", id)))
    }

    pub fn unspent(&self) -> Vec<UnspentTip> {
        self.index()
            .unspent()
            .into_iter()
            .map(|(digest, block)| UnspentTip { digest, block })
            .collect()
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Client-side entry point for CA lineages: submits CertBlocks to a random
//! roster member and checks inclusion proofs against the ledger.

use certchain::inclusion::block_anchors;
use certchain::{AuthenticationPath, BlockHandle, BlockId, CertBlock, LedgerBlock, Roster, ServerIdentity};
use reqwest::Client;
use tracing::debug;

use crate::api::{AppendBlockRequest, CreateChainRequest};
use crate::errors::GatewayError;
use crate::network::CertChainClient;

#[derive(Debug, Clone, Default)]
pub struct LedgerGateway {
    http: Client,
    token: Option<String>,
}

impl LedgerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn client_for(&self, member: &ServerIdentity) -> CertChainClient {
        CertChainClient::with_http(self.http.clone(), member.address.clone()).with_token(self.token.clone())
    }

    fn pick(&self, roster: &Roster) -> Result<CertChainClient, GatewayError> {
        let member = {
            let mut rng = rand::thread_rng();
            roster.random_member(&mut rng).cloned()
        };
        let member = member.ok_or(GatewayError::EmptyRoster)?;
        debug!(node = %member.name, address = %member.address, "selected roster member");
        Ok(self.client_for(&member))
    }

    /// Start a new ledger chain with a genesis CertBlock. No retry: a
    /// transport failure is returned as is.
    pub async fn submit_genesis(&self, roster: &Roster, block: &CertBlock) -> Result<LedgerBlock, GatewayError> {
        let client = self.pick(roster)?;
        let req = CreateChainRequest {
            roster: roster.clone(),
            block: block.clone(),
        };
        Ok(client.create_chain(&req).await?.block)
    }

    /// Append `block` after `prior`, through a random member of its roster.
    pub async fn submit_successor(&self, prior: &LedgerBlock, block: &CertBlock) -> Result<LedgerBlock, GatewayError> {
        let client = self.pick(&prior.roster)?;
        let req = AppendBlockRequest {
            prior: prior.handle(),
            block: block.clone(),
        };
        Ok(client.append_block(&req).await?.block)
    }

    pub async fn fetch_block(&self, roster: &Roster, id: &BlockId) -> Result<LedgerBlock, GatewayError> {
        self.pick(roster)?.get_block(id).await
    }

    /// Walk back links from `tip` over HTTP until a block anchors `path`.
    pub async fn verify_inclusion(
        &self,
        path: &AuthenticationPath,
        tip: &LedgerBlock,
    ) -> Result<Option<BlockHandle>, GatewayError> {
        if !path.is_presence() {
            return Ok(None);
        }
        let Some(root) = path.recompute_root() else {
            return Ok(None);
        };

        let mut current = tip.clone();
        loop {
            let anchored = block_anchors(&root, path.epoch, &current)
                .map_err(|e| GatewayError::Protocol(format!("block {}: {}", current.id, e)))?;
            if anchored {
                return Ok(Some(current.handle()));
            }
            let Some(back) = current.back_link else {
                return Ok(None);
            };
            current = self.fetch_block(&tip.roster, &back).await?;
        }
    }
}

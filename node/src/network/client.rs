// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use certchain::{BlockId, IndexDelta, LedgerBlock};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::{
    AppendBlockRequest, AppendBlockResponse, CreateChainRequest, CreateChainResponse, ErrorBody, PropagateAck,
    UnspentResponse,
};
use crate::errors::GatewayError;

/// HTTP client for one CertChain node.
#[derive(Debug, Clone)]
pub struct CertChainClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl CertChainClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), url)
    }

    /// Share an existing connection pool.
    pub fn with_http(client: Client, url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }

    pub async fn create_chain(&self, req: &CreateChainRequest) -> Result<CreateChainResponse, GatewayError> {
        let resp = self
            .request(Method::POST, "/v1/chain/create")
            .json(req)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        decode(resp).await
    }

    pub async fn append_block(&self, req: &AppendBlockRequest) -> Result<AppendBlockResponse, GatewayError> {
        let resp = self
            .request(Method::POST, "/v1/chain/append")
            .json(req)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        decode(resp).await
    }

    pub async fn get_block(&self, id: &BlockId) -> Result<LedgerBlock, GatewayError> {
        let resp = self
            .request(Method::GET, &format!("/v1/chain/block/{}", id))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        decode(resp).await
    }

    pub async fn send_delta(&self, delta: &IndexDelta) -> Result<PropagateAck, GatewayError> {
        let resp = self
            .request(Method::POST, "/v1/propagate")
            .json(delta)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        decode(resp).await
    }

    pub async fn unspent(&self) -> Result<UnspentResponse, GatewayError> {
        let resp = self
            .request(Method::GET, "/v1/index/unspent")
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()));
    }

    let body: Option<ErrorBody> = resp.json().await.ok();
    let message = body
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::CONFLICT => Err(GatewayError::Rejected {
            reason: body.and_then(|b| b.reason),
            message,
        }),
        StatusCode::NOT_FOUND => Err(GatewayError::NotFound(message)),
        _ => Err(GatewayError::Protocol(format!("{}: {}", status, message))),
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use certchain::{BlockId, IndexDelta, LedgerBlock};
use tower_http::trace::TraceLayer;

use crate::api::*;
use crate::errors::NodeError;
use crate::service::SharedService;

async fn auth_guard(State(token): State<Arc<String>>, req: Request, next: Next) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == token.as_str() => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub fn build_router(service: SharedService, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        .route("/v1/chain/create", post(create_chain))
        .route("/v1/chain/append", post(append_block))
        .route("/v1/chain/block/:id", get(get_block))
        .route("/v1/propagate", post(propagate))
        .route("/v1/index/unspent", get(unspent))
        // Observability
        .route("/metrics", get(metrics_handler))
        .with_state(service);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        app = app.layer(from_fn_with_state(Arc::new(token), auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app.layer(TraceLayer::new_for_http())
}

async fn create_chain(
    State(service): State<SharedService>,
    Json(req): Json<CreateChainRequest>,
) -> Result<Json<CreateChainResponse>, NodeError> {
    let (block, acks) = service.create_chain(req).await?;
    Ok(Json(CreateChainResponse { block, acks }))
}

async fn append_block(
    State(service): State<SharedService>,
    Json(req): Json<AppendBlockRequest>,
) -> Result<Json<AppendBlockResponse>, NodeError> {
    let (block, acks) = service.append_block(req).await?;
    Ok(Json(AppendBlockResponse { block, acks }))
}

async fn get_block(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<Json<LedgerBlock>, NodeError> {
    let id = BlockId::from_hex(&id).map_err(|e| NodeError::InvalidInput(format!("block id: {}", e)))?;
    Ok(Json(service.block(&id)?))
}

async fn propagate(
    State(service): State<SharedService>,
    Json(delta): Json<IndexDelta>,
) -> Result<Json<PropagateAck>, NodeError> {
    let applied = service.receive_delta(&delta)?;
    tracing::debug!(digest = %delta.head_digest.short(), applied, "delta received");
    Ok(Json(PropagateAck { applied }))
}

async fn unspent(State(service): State<SharedService>) -> Json<UnspentResponse> {
    Json(UnspentResponse {
        tips: service.unspent(),
    })
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}

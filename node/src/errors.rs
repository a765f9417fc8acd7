// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use certchain::RejectReason;
use thiserror::Error;

use crate::api::ErrorBody;
use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Block rejected: {0}")]
    Rejected(RejectReason),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
    #[error("Ledger storage failure: {0}")]
    Storage(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = match &self {
            NodeError::Rejected(_) => StatusCode::CONFLICT,
            NodeError::NotFound(_) => StatusCode::NOT_FOUND,
            NodeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            NodeError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            NodeError::Storage(_) | NodeError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let reason = match &self {
            NodeError::Rejected(reason) => Some(*reason),
            _ => None,
        };

        let body = Json(ErrorBody {
            error: self.to_string(),
            reason,
        });

        (status, body).into_response()
    }
}

impl From<LedgerError> for NodeError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(reason) => NodeError::Rejected(reason),
            LedgerError::UnknownBlock(id) => NodeError::NotFound(format!("block {}", id)),
            LedgerError::NoVerifier(id) => NodeError::Unavailable(format!("no verifier {} registered", id)),
            e @ LedgerError::Storage { .. } => NodeError::Storage(e.to_string()),
            LedgerError::Chain(e) => NodeError::Storage(e.to_string()),
        }
    }
}

/// Client-side failures talking to CertChain nodes.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Block rejected: {message}")]
    Rejected {
        reason: Option<RejectReason>,
        message: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Roster is empty")]
    EmptyRoster,
}

impl GatewayError {
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            GatewayError::Rejected { reason, .. } => *reason,
            _ => None,
        }
    }
}

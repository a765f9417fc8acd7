// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use certchain::{BlockHandle, CertBlock, Digest, LedgerBlock, RejectReason, Roster};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChainRequest {
    pub roster: Roster,
    pub block: CertBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChainResponse {
    pub block: LedgerBlock,
    /// Roster members that acknowledged the index delta.
    pub acks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendBlockRequest {
    pub prior: BlockHandle,
    pub block: CertBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendBlockResponse {
    pub block: LedgerBlock,
    pub acks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagateAck {
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentTip {
    pub digest: Digest,
    pub block: BlockHandle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnspentResponse {
    pub tips: Vec<UnspentTip>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

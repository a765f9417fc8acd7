// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pushes index deltas to every roster member.
//!
//! Delivery is best effort: one attempt per member, bounded by a timeout,
//! and a shortfall is only logged. Nothing is retried or rolled back.

use std::time::Duration;

use certchain::{IndexDelta, Roster};
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};

use crate::network::CertChainClient;

pub const DEFAULT_PROPAGATE_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone)]
pub struct Propagator {
    http: Client,
    token: Option<String>,
    timeout: Duration,
}

impl Propagator {
    pub fn new(timeout: Duration, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            token,
            timeout,
        }
    }

    /// Send `delta` to all members concurrently. Returns the number of acks.
    pub async fn propagate(&self, roster: &Roster, delta: &IndexDelta) -> usize {
        let sends = roster.iter().map(|member| {
            let client = CertChainClient::with_http(self.http.clone(), member.address.clone())
                .with_token(self.token.clone());
            async move { tokio::time::timeout(self.timeout, client.send_delta(delta)).await }
        });
        let results = join_all(sends).await;

        let mut acks = 0;
        for (member, result) in roster.iter().zip(results) {
            match result {
                Ok(Ok(_)) => acks += 1,
                Ok(Err(e)) => warn!(node = %member.name, error = %e, "delta delivery failed"),
                Err(_) => warn!(node = %member.name, timeout_ms = self.timeout.as_millis() as u64, "delta delivery timed out"),
            }
        }

        metrics::counter!("certchain_propagation_acks_total", acks as u64);
        if acks != roster.len() {
            warn!(
                acks,
                expected = roster.len(),
                digest = %delta.head_digest.short(),
                "did not get all propagation acks"
            );
            metrics::counter!("certchain_propagation_shortfall_total", 1);
        } else {
            debug!(acks, digest = %delta.head_digest.short(), "delta propagated");
        }
        acks
    }
}

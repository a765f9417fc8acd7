// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "certchain_node=debug,certchain=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let handle = PrometheusBuilder::new().install_recorder()?;
    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!("certchain_blocks_accepted_total", "Blocks admitted to the ledger");
    metrics::describe_counter!("certchain_blocks_rejected_total", "Blocks refused, labelled by reason");
    metrics::describe_histogram!("certchain_admission_duration_seconds", "Time from request to ledger admission");
    metrics::describe_counter!("certchain_propagation_acks_total", "Index deltas acknowledged by peers");
    metrics::describe_counter!("certchain_propagation_shortfall_total", "Propagations acknowledged by fewer than all peers");
    metrics::describe_gauge!("certchain_unspent_tips", "Unspent head digests in the local index");

    metrics::gauge!("certchain_node_up", 1.0);
    Ok(())
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use anyhow::Context;
use certchain_node::config::NodeConfig;
use certchain_node::ledger::LocalLedger;
use certchain_node::server::build_router;
use certchain_node::service::CertChainService;
use certchain_node::telemetry::init_telemetry;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry()?;

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing CertChain node with config: {:?}", cfg);

    let ledger = match &cfg.block_log_path {
        Some(path) => LocalLedger::open(path).with_context(|| format!("opening block log {}", path.display()))?,
        None => {
            tracing::warn!("No block log configured; ledger is in-memory only");
            LocalLedger::in_memory()
        }
    };

    let service = Arc::new(CertChainService::from_config(&cfg, Arc::new(ledger)));
    service.rebuild_index();

    let app = build_router(service, cfg.auth_token.clone());

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {} as {}", addr, cfg.identity().address);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

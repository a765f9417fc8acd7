// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use certchain::ServerIdentity;
use thiserror::Error;

use crate::propagation::DEFAULT_PROPAGATE_TIMEOUT;

#[derive(Error, Debug)]
#[error("invalid value {value:?} for {var}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub name: String,
    pub bind_addr: SocketAddr,
    /// Address peers and clients reach this node on; defaults to `http://{bind_addr}`.
    pub public_url: Option<String>,
    pub auth_token: Option<String>,
    pub block_log_path: Option<PathBuf>,
    pub propagate_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "certchain-node".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7770)),
            public_url: None,
            auth_token: None,
            block_log_path: None,
            propagate_timeout: DEFAULT_PROPAGATE_TIMEOUT,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `CERTCHAIN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = lookup("CERTCHAIN_BIND") {
            cfg.bind_addr = v.parse().map_err(|_| ConfigError {
                var: "CERTCHAIN_BIND",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("CERTCHAIN_NAME") {
            cfg.name = v;
        }
        if let Some(v) = lookup("CERTCHAIN_PUBLIC_URL") {
            cfg.public_url = Some(v.trim_end_matches('/').to_string());
        }
        cfg.auth_token = lookup("CERTCHAIN_TOKEN").filter(|t| !t.is_empty());
        cfg.block_log_path = lookup("CERTCHAIN_BLOCK_LOG").map(PathBuf::from);
        if let Some(v) = lookup("CERTCHAIN_PROPAGATE_TIMEOUT_MS") {
            let ms: u64 = v.parse().map_err(|_| ConfigError {
                var: "CERTCHAIN_PROPAGATE_TIMEOUT_MS",
                value: v.clone(),
            })?;
            cfg.propagate_timeout = Duration::from_millis(ms);
        }

        Ok(cfg)
    }

    pub fn identity(&self) -> ServerIdentity {
        let address = self
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_addr));
        ServerIdentity::new(self.name.clone(), address)
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use certchain::{random_certificates, CertBlockBuilder, Certificate, Roster, ServerIdentity, Signer, SparseMerkleMap};
use certchain_node::ledger::LocalLedger;
use certchain_node::network::CertChainClient;
use certchain_node::propagation::Propagator;
use certchain_node::server::build_router;
use certchain_node::service::{CertChainService, SharedService};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct TestNode {
    pub identity: ServerIdentity,
    pub service: SharedService,
}

impl TestNode {
    pub fn client(&self) -> CertChainClient {
        CertChainClient::new(self.identity.address.clone())
    }
}

pub struct Cluster {
    pub ledger: Arc<LocalLedger>,
    pub nodes: Vec<TestNode>,
    pub roster: Roster,
}

/// `n` nodes on ephemeral ports sharing one in-process ledger.
pub async fn spawn_cluster(n: usize) -> Cluster {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let ledger = Arc::new(LocalLedger::in_memory());
    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let identity = ServerIdentity::new(format!("node-{}", i), format!("http://{}", addr));

        let propagator = Propagator::new(Duration::from_secs(2), None);
        let service = Arc::new(CertChainService::new(identity.clone(), ledger.clone(), propagator));
        let app = build_router(service.clone(), None);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        nodes.push(TestNode { identity, service });
    }
    let roster = Roster::new(nodes.iter().map(|n| n.identity.clone()).collect());
    Cluster { ledger, nodes, roster }
}

pub fn lineage(seed: u8) -> CertBlockBuilder {
    CertBlockBuilder::new(
        Signer::from_secret(&[seed; 32]),
        SparseMerkleMap::new([seed.wrapping_add(1); 32]),
    )
}

pub fn certs(seed: u64, identities: &[&str]) -> Vec<Certificate> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_certificates(&mut rng, identities)
}

pub const FIVE: [&str; 5] = ["a@x.com", "b@x.com", "c@x.com", "d@x.com", "e@x.com"];

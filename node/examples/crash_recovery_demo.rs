// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Restart Demo
//!
//! Admits a short lineage into a file-backed ledger, drops the node, then
//! reopens the block log and rebuilds the unspent index from it.

use std::sync::Arc;
use std::time::Duration;

use certchain::{random_certificates, CertBlockBuilder, Roster, ServerIdentity, Signer, SparseMerkleMap};
use certchain_node::api::{AppendBlockRequest, CreateChainRequest};
use certchain_node::ledger::LocalLedger;
use certchain_node::propagation::Propagator;
use certchain_node::service::CertChainService;
use rand::rngs::OsRng;
use tempfile::tempdir;

const IDENTITIES: [&str; 3] = ["alice@example.com", "bob@example.com", "carol@example.com"];

fn node(ledger: LocalLedger) -> CertChainService {
    let identity = ServerIdentity::new("demo", "http://127.0.0.1:9");
    CertChainService::new(identity, Arc::new(ledger), Propagator::new(Duration::from_millis(200), None))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("\n=== CertChain Restart Demo ===\n");

    let dir = tempdir()?;
    let path = dir.path().join("blocks.log");
    let roster = Roster::new(vec![ServerIdentity::new("demo", "http://127.0.0.1:9")]);
    let mut ca = CertBlockBuilder::new(Signer::generate(&mut OsRng), SparseMerkleMap::new([7; 32]));

    println!("Phase 1: genesis + 3 successors");
    {
        let svc = node(LocalLedger::open(&path)?);
        let genesis = ca.build(&random_certificates(&mut OsRng, &IDENTITIES))?;
        let (mut prior, _) = svc
            .create_chain(CreateChainRequest { roster, block: genesis.clone() })
            .await?;
        ca.accept(&genesis);

        for _ in 0..3 {
            let next = ca.build(&random_certificates(&mut OsRng, &IDENTITIES))?;
            let (block, _) = svc
                .append_block(AppendBlockRequest { prior: prior.handle(), block: next.clone() })
                .await?;
            ca.accept(&next);
            prior = block;
        }
        println!("   tips before restart: {}", svc.unspent().len());
    }

    println!("Phase 2: reopen block log");
    let svc = node(LocalLedger::open(&path)?);
    let applied = svc.rebuild_index();
    println!("   blocks replayed: {}", applied);
    for tip in svc.unspent() {
        println!("   tip {} at block {}", tip.digest.short(), tip.block.index);
    }

    Ok(())
}

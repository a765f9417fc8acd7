// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use certchain::{
    verify_inclusion, AuthenticationPath, BlockHandle, BlockId, Digest, IndexDelta, LedgerBlock, MemoryChain,
    RejectReason, Verdict, VerificationEngine,
};
use certchain_node::ledger::block_log::read_block_log;
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a CertChain block log and check inclusion proofs", long_about = None)]
struct Args {
    /// Path to the block log (e.g. blocks.log)
    block_log: PathBuf,

    /// Authentication path JSON to check against the ledger
    #[arg(long, requires = "tip")]
    path: Option<PathBuf>,

    /// Hex id of the block to start the inclusion walk from
    #[arg(long, requires = "path")]
    tip: Option<String>,
}

#[derive(Serialize, Debug)]
struct Rejection {
    block: BlockId,
    index: u64,
    reason: RejectReason,
}

#[derive(Serialize, Debug)]
struct Tip {
    digest: Digest,
    block: BlockHandle,
}

#[derive(Serialize, Debug)]
struct AuditReport {
    blocks: usize,
    accepted: usize,
    rejected: Vec<Rejection>,
    tips: Vec<Tip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inclusion: Option<Inclusion>,
}

#[derive(Serialize, Debug)]
struct Inclusion {
    identity: String,
    anchored_at: Option<BlockHandle>,
}

/// Run every block through a fresh engine, in log order.
fn replay(blocks: Vec<LedgerBlock>) -> (Arc<MemoryChain>, AuditReport) {
    let chain = Arc::new(MemoryChain::new());
    let engine = VerificationEngine::new(chain.clone());

    let total = blocks.len();
    let mut accepted = 0;
    let mut rejected = Vec::new();

    for block in blocks {
        match engine.evaluate(&block) {
            Verdict::Accepted => {
                // evaluate() already decoded the payload.
                if let Ok(cert) = block.cert_block() {
                    engine.index().apply(&IndexDelta::admitted(&cert, block.handle()));
                }
                accepted += 1;
                chain.insert(block);
            }
            // Left out of the chain: successors of a rejected block are
            // rejected as well.
            Verdict::Rejected(reason) => rejected.push(Rejection {
                block: block.id,
                index: block.index,
                reason,
            }),
        }
    }

    let tips = engine
        .index()
        .unspent()
        .into_iter()
        .map(|(digest, block)| Tip { digest, block })
        .collect();

    let report = AuditReport {
        blocks: total,
        accepted,
        rejected,
        tips,
        inclusion: None,
    };
    (chain, report)
}

fn main() -> Result<()> {
    let args = Args::parse();

    eprintln!("CertChain Auditor v0.1.0");

    let blocks = read_block_log(&args.block_log)
        .with_context(|| format!("Failed to read block log {}", args.block_log.display()))?;
    let (chain, mut report) = replay(blocks);

    if let (Some(path_file), Some(tip)) = (&args.path, &args.tip) {
        let raw = fs::read(path_file).context("Failed to read authentication path")?;
        let path: AuthenticationPath = serde_json::from_slice(&raw).context("Failed to parse authentication path JSON")?;
        let tip_id = BlockId::from_hex(tip).context("Tip is not a hex block id")?;
        let tip_block = chain
            .get(&tip_id)
            .with_context(|| format!("Tip {} is not in the block log", tip_id))?;

        let anchored_at = verify_inclusion(chain.as_ref(), &path, &tip_block).context("Inclusion walk failed")?;
        report.inclusion = Some(Inclusion {
            identity: path.lookup_key.clone(),
            anchored_at,
        });
    }

    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);

    Ok(())
}

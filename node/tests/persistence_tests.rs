// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use std::sync::Arc;
use std::time::Duration;

use certchain::{Roster, ServerIdentity};
use certchain_node::api::{AppendBlockRequest, CreateChainRequest};
use certchain_node::ledger::LocalLedger;
use certchain_node::propagation::Propagator;
use certchain_node::service::CertChainService;
use common::{certs, lineage, FIVE};
use tempfile::tempdir;

fn node(ledger: LocalLedger) -> CertChainService {
    // Propagation to the discard port fails; the local index is updated anyway.
    let identity = ServerIdentity::new("solo", "http://127.0.0.1:9");
    CertChainService::new(identity, Arc::new(ledger), Propagator::new(Duration::from_millis(200), None))
}

#[tokio::test]
async fn restart_rebuilds_index_from_block_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blocks.log");
    let roster = Roster::new(vec![ServerIdentity::new("solo", "http://127.0.0.1:9")]);
    let mut ca = lineage(11);

    let (gb, sb) = {
        let svc = node(LocalLedger::open(&path).unwrap());
        let g = ca.build(&certs(1, &FIVE)).unwrap();
        let (gb, _) = svc
            .create_chain(CreateChainRequest { roster: roster.clone(), block: g.clone() })
            .await
            .unwrap();
        ca.accept(&g);

        let s = ca.build(&certs(2, &FIVE)).unwrap();
        let (sb, _) = svc
            .append_block(AppendBlockRequest { prior: gb.handle(), block: s.clone() })
            .await
            .unwrap();
        ca.accept(&s);
        (gb, sb)
    };

    let svc = node(LocalLedger::open(&path).unwrap());
    assert_eq!(svc.rebuild_index(), 2);
    let tips = svc.unspent();
    assert_eq!(tips.len(), 1);
    assert_eq!(tips[0].block, sb.handle());
    assert_eq!(svc.block(&gb.id).unwrap(), gb);

    let t = ca.build(&certs(3, &["f@x.com"])).unwrap();
    let (tb, _) = svc
        .append_block(AppendBlockRequest { prior: sb.handle(), block: t })
        .await
        .unwrap();
    assert_eq!(tb.index, 2);

    // The genesis head stays consumed after the restart.
    let fork = {
        let mut replay = lineage(11);
        replay.build(&certs(1, &FIVE)).unwrap()
    };
    let mut forked = lineage(11);
    forked.accept(&fork);
    let s2 = forked.build(&certs(9, &["z@x.com"])).unwrap();
    let err = svc
        .append_block(AppendBlockRequest { prior: gb.handle(), block: s2 })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        certchain_node::errors::NodeError::Rejected(certchain::RejectReason::SpentPredecessor)
    ));
}

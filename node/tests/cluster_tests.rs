// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use certchain::{BlockId, Digest, RejectReason};
use certchain_node::api::AppendBlockRequest;
use certchain_node::errors::GatewayError;
use certchain_node::network::LedgerGateway;
use common::{certs, lineage, spawn_cluster, FIVE};

#[tokio::test]
async fn genesis_reaches_every_node() {
    let cluster = spawn_cluster(3).await;
    let gateway = LedgerGateway::new();
    let mut ca = lineage(1);

    let g = ca.build(&certs(1, &FIVE)).unwrap();
    let gb = gateway.submit_genesis(&cluster.roster, &g).await.unwrap();
    assert!(gb.is_genesis());
    assert_eq!(gb.roster, cluster.roster);

    for node in &cluster.nodes {
        let tips = node.client().unspent().await.unwrap().tips;
        assert_eq!(tips.len(), 1, "node {}", node.identity.name);
        assert_eq!(tips[0].digest, g.latest_head_digest);
        assert_eq!(tips[0].block, gb.handle());
    }
}

#[tokio::test]
async fn successor_spends_and_clone_is_refused() {
    let cluster = spawn_cluster(3).await;
    let gateway = LedgerGateway::new();
    let mut ca = lineage(2);

    let g = ca.build(&certs(1, &FIVE)).unwrap();
    let gb = gateway.submit_genesis(&cluster.roster, &g).await.unwrap();
    ca.accept(&g);

    let s = ca.build(&certs(2, &FIVE)).unwrap();
    let sb = gateway.submit_successor(&gb, &s).await.unwrap();
    assert_eq!(sb.back_link, Some(gb.id));
    ca.accept(&s);

    for node in &cluster.nodes {
        assert!(node.service.index().is_spent(&g.latest_head_digest));
        assert_eq!(node.service.index().tip(&s.latest_head_digest), Some(sb.handle()));
    }

    let err = gateway.submit_successor(&gb, &s).await.unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::SpentPredecessor));
    assert_eq!(cluster.ledger.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_successors_on_different_nodes() {
    let cluster = spawn_cluster(3).await;
    let gateway = LedgerGateway::new();
    let mut ca = lineage(3);

    let g = ca.build(&certs(1, &FIVE)).unwrap();
    let gb = gateway.submit_genesis(&cluster.roster, &g).await.unwrap();
    ca.accept(&g);

    let b2a = ca.build(&certs(2, &["left@x.com"])).unwrap();
    let b2b = ca.build(&certs(3, &["right@x.com"])).unwrap();
    let req_a = AppendBlockRequest { prior: gb.handle(), block: b2a };
    let req_b = AppendBlockRequest { prior: gb.handle(), block: b2b };

    let client_a = cluster.nodes[0].client();
    let client_b = cluster.nodes[1].client();
    let (ra, rb) = tokio::join!(client_a.append_block(&req_a), client_b.append_block(&req_b));

    let outcomes = [ra.is_ok(), rb.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let loser = if ra.is_ok() { rb.unwrap_err() } else { ra.unwrap_err() };
    assert_eq!(loser.reject_reason(), Some(RejectReason::SpentPredecessor));
    assert_eq!(cluster.ledger.len(), 2);
}

#[tokio::test]
async fn foreign_signer_is_refused() {
    let cluster = spawn_cluster(2).await;
    let gateway = LedgerGateway::new();
    let mut ca = lineage(4);

    let g = ca.build(&certs(1, &FIVE)).unwrap();
    let gb = gateway.submit_genesis(&cluster.roster, &g).await.unwrap();

    let mut intruder = lineage(40);
    intruder.accept(&g);
    let forged = intruder.build(&certs(9, &["a@x.com"])).unwrap();

    let err = gateway.submit_successor(&gb, &forged).await.unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::InvalidSignature));
    for node in &cluster.nodes {
        assert!(node.service.index().is_unspent(&g.latest_head_digest));
    }
}

#[tokio::test]
async fn inclusion_walk_over_http() {
    let cluster = spawn_cluster(3).await;
    let gateway = LedgerGateway::new();
    let mut ca = lineage(5);

    let mut blocks = Vec::new();
    for i in 0..3u64 {
        let identity = format!("user{}@x.com", i);
        let cert = ca.build(&certs(i, &[identity.as_str()])).unwrap();
        let block = match blocks.last() {
            None => gateway.submit_genesis(&cluster.roster, &cert).await.unwrap(),
            Some(prior) => gateway.submit_successor(prior, &cert).await.unwrap(),
        };
        ca.accept(&cert);
        blocks.push(block);
    }
    let tip = blocks.last().unwrap();

    for (i, block) in blocks.iter().enumerate() {
        let path = ca.prove(&format!("user{}@x.com", i)).unwrap();
        let found = gateway.verify_inclusion(&path, tip).await.unwrap();
        assert_eq!(found, Some(block.handle()));
    }

    let absent = ca.lookup("nobody@x.com");
    assert_eq!(gateway.verify_inclusion(&absent, tip).await.unwrap(), None);
}

#[tokio::test]
async fn block_lookup_errors() {
    let cluster = spawn_cluster(1).await;
    let client = cluster.nodes[0].client();

    let err = client.get_block(&BlockId(Digest([7; 32]))).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));

    let gateway = LedgerGateway::new();
    let err = gateway
        .submit_genesis(&certchain::Roster::default(), &lineage(6).build(&certs(1, &FIVE)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::EmptyRoster));
}

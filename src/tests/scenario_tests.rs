// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! End to end: one lineage, a re-issued identity and a replayed successor.

use crate::block::Certificate;
use crate::inclusion::verify_inclusion;
use crate::ledger::RejectReason;
use crate::tests::support::{certs, lineage, TestLedger};

fn five_for_a(seed: u64) -> Vec<Certificate> {
    certs(seed, &["a@x.com"; 5])
}

#[test]
fn genesis_successor_and_replayed_clone() {
    let ledger = TestLedger::new();
    let mut ca = lineage(7);

    let g = ca.build(&five_for_a(1)).unwrap();
    let gb = ledger.genesis(&g).unwrap();
    ca.accept(&g);
    assert!(ledger.engine.index().is_unspent(&g.latest_head_digest));

    let s = ca.build(&five_for_a(2)).unwrap();
    assert_eq!(s.prev_head_digest, g.latest_head_digest);
    let sb = ledger.append(&gb, &s).unwrap();
    ca.accept(&s);

    let index = ledger.engine.index();
    assert!(index.is_spent(&g.latest_head_digest));
    assert!(index.is_unspent(&s.latest_head_digest));

    let clone = s.clone();
    assert_eq!(ledger.append(&gb, &clone), Err(RejectReason::SpentPredecessor));
    assert_eq!(index.tip(&s.latest_head_digest), Some(sb.handle()));

    // One identity, re-issued: the last certificate of S is the live one.
    let head = s.head().unwrap();
    assert_eq!(head.size, 1);
    assert_eq!(head.epoch, 2);

    let path = ca.prove("a@x.com").unwrap();
    assert_eq!(path.value(), Some(five_for_a(2)[4].der.as_slice()));
    assert_eq!(
        verify_inclusion(ledger.chain.as_ref(), &path, &sb).unwrap(),
        Some(sb.handle())
    );
}

#[test]
fn certificates_of_refused_block_anchor_in_next_admitted_one() {
    let ledger = TestLedger::new();
    let mut ca = lineage(8);

    let g = ca.build(&certs(1, &["a@x.com"])).unwrap();
    let gb = ledger.genesis(&g).unwrap();
    ca.accept(&g);

    // Corrupted before submission: the ledger refuses it, the map keeps b@x.com.
    let refused = ca.build(&certs(2, &["b@x.com"])).unwrap();
    let mut forged = refused.clone();
    forged.latest_signed_head[0] ^= 0xff;
    forged.latest_head_digest = crate::hash::hash_bytes(&forged.latest_signed_head);
    assert_eq!(ledger.append(&gb, &forged), Err(RejectReason::InvalidSignature));

    let s = ca.build(&certs(3, &["c@x.com"])).unwrap();
    let sb = ledger.append(&gb, &s).unwrap();
    ca.accept(&s);

    let path = ca.prove("b@x.com").unwrap();
    assert_eq!(
        verify_inclusion(ledger.chain.as_ref(), &path, &sb).unwrap(),
        Some(sb.handle())
    );
}

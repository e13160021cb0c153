//! Cross-module scenario tests against worked examples and properties using
//! the deterministic `XorHasher`.

use std::sync::Arc;

use balloon::{Balloon, BalloonConfig, CacheStrategy};
use balloon_crypto::{HashAlgorithm, Hasher};
use balloon_store::{Store, TableId};
use balloon_store::MemoryStore;

fn xor_config() -> BalloonConfig {
    BalloonConfig {
        hash_algorithm: HashAlgorithm::Xor,
        cache_height_limit: 0,
        cache_strategy: CacheStrategy::InMemory,
    }
}

fn open(store: Arc<dyn Store>) -> Balloon {
    Balloon::open(store, xor_config()).unwrap()
}

/// Five events are added in sequence and every one of them must verify
/// membership against its own commitment.
#[test]
fn balloon_end_to_end_scenario() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let balloon = open(store);

    let events = ["test event 0", "test event 1", "test event 2", "test event 3", "test event 4"];
    let mut commitments = Vec::new();
    for (expected_version, event) in events.iter().enumerate() {
        let commitment = balloon.add(event.as_bytes()).unwrap();
        assert_eq!(commitment.version, expected_version as u64, "event {event:?}");
        commitments.push(commitment);
    }

    let latest = commitments.last().unwrap();
    for (version, event) in events.iter().enumerate() {
        let key = balloon.hasher().hash(&[event.as_bytes()]);
        let proof = balloon.query_membership(key.as_bytes(), version as u64).unwrap();
        assert!(proof.exists, "event {event:?} should be a member as of its own version");
        assert!(proof.verify(latest, &commitments[version], 8, balloon.hasher().as_ref()).unwrap());
    }
}

/// Two independent balloons fed the same event sequence produce identical
/// commitments at every step.
#[test]
fn determinism_across_independent_runs() {
    let events = ["a", "b", "c", "d", "e"];

    let run = || {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let balloon = open(store);
        events.iter().map(|e| balloon.add(e.as_bytes()).unwrap()).collect::<Vec<_>>()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
}

/// Consistency verification succeeds for every pair `start <= end <=
/// current`.
#[test]
fn prefix_consistency_holds_for_every_pair() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let balloon = open(store);
    let commitments: Vec<_> = (0..6).map(|v| balloon.add(format!("event {v}").as_bytes()).unwrap()).collect();

    for start in 0..commitments.len() {
        for end in start..commitments.len() {
            let proof = balloon.query_consistency(start as u64, end as u64).unwrap();
            let ok = proof
                .verify(&commitments[start], &commitments[end], balloon.hasher().as_ref())
                .unwrap();
            assert!(ok, "consistency({start}, {end}) should verify");
        }
    }
}

/// Requesting consistency between versions 3 and 5 after inserting six
/// events reconstructs both endpoints' history roots and matches them
/// against the commitments recorded at those versions.
#[test]
fn consistency_scenario_matches_worked_example() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let balloon = open(store);
    let commitments: Vec<_> = (0..6).map(|v| balloon.add(&[v as u8]).unwrap()).collect();

    let proof = balloon.query_consistency(3, 5).unwrap();
    assert!(proof.verify(&commitments[3], &commitments[5], balloon.hasher().as_ref()).unwrap());
}

/// Membership and non-membership soundness.
#[test]
fn membership_and_non_membership_soundness() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let balloon = open(store);

    let inserted_at = 2u64;
    let mut commitments = Vec::new();
    for v in 0..5u64 {
        commitments.push(balloon.add(&[v as u8]).unwrap());
    }

    // the hyper tree is current-only, so every proof is checked against the
    // most recent commitment regardless of query_version
    let latest = commitments.last().unwrap();

    // inserted event verifies for every v' >= the version it was inserted at
    for query_version in inserted_at..5 {
        let proof = balloon.query_membership(&[inserted_at as u8], query_version).unwrap();
        assert!(proof.exists);
        assert!(proof
            .verify(latest, &commitments[query_version as usize], 8, balloon.hasher().as_ref())
            .unwrap());
    }

    // and fails to claim membership for any v' strictly before it
    for query_version in 0..inserted_at {
        let proof = balloon.query_membership(&[inserted_at as u8], query_version).unwrap();
        assert!(!proof.exists);
    }

    // an event that was never inserted reports non-membership and verifies
    let never_inserted = [0xffu8];
    let proof = balloon.query_membership(&never_inserted, 4).unwrap();
    assert!(!proof.exists);
    assert!(proof.verify(latest, &commitments[4], 8, balloon.hasher().as_ref()).unwrap());
}

/// `add_bulk` produces the same commitments as sequential `add` calls, and
/// the resulting store states agree on both tree roots.
#[test]
fn add_bulk_matches_sequential_adds() {
    let events: Vec<Vec<u8>> = (0..10u8).map(|b| vec![b]).collect();

    let sequential_store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let sequential = open(sequential_store.clone());
    let sequential_commitments: Vec<_> = events.iter().map(|e| sequential.add(e).unwrap()).collect();

    let bulk_store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let bulk = open(bulk_store.clone());
    let bulk_commitments = bulk.add_bulk(&events).unwrap();

    assert_eq!(sequential_commitments, bulk_commitments);

    for table in [TableId::History, TableId::Hyper, TableId::HyperCache] {
        let mut seq_reader = sequential_store.get_all(table).unwrap();
        let mut bulk_reader = bulk_store.get_all(table).unwrap();
        assert_eq!(seq_reader.next_batch().unwrap(), bulk_reader.next_batch().unwrap());
    }
}

/// Reopening a balloon over an existing store and rebuilding its hyper cache
/// reproduces the same root as before shutdown.
#[test]
fn rebuild_after_reopen_reproduces_the_same_root() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let commitment = {
        let balloon = open(store.clone());
        let mut last = None;
        for v in 0..8u8 {
            last = Some(balloon.add(&[v]).unwrap());
        }
        last.unwrap()
    };

    let reopened = open(store);
    assert_eq!(reopened.current_version(), commitment.version + 1);
    let proof = reopened.query_membership(&[3], 7).unwrap();
    assert!(proof.exists);
}

/// Every bulk-inserted event must independently verify membership.
#[test]
fn bulk_inserted_events_all_verify_membership() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let balloon = open(store);
    let events: Vec<Vec<u8>> = (0..16u8).map(|b| vec![b]).collect();
    let commitments = balloon.add_bulk(&events).unwrap();

    let latest = commitments.last().unwrap();
    for (version, event) in events.iter().enumerate() {
        let proof = balloon.query_membership(event, commitments.len() as u64 - 1).unwrap();
        assert!(proof.exists, "event {version} should be a member");
        assert!(proof.verify(latest, latest, 8, balloon.hasher().as_ref()).unwrap());
    }
}

/// Inserting `0x5a` at version 0 with a cache limit of 0 reproduces a
/// hand-worked hyper root byte-for-byte: with `cache_height_limit = 0` every
/// height above the leaf is through-cache (plain inner-hash nodes, no
/// shortcuts), so the whole path from root to leaf is just XorHasher-reduced
/// bytes, computable on paper.
#[test]
fn hyper_scenario_matches_worked_example() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let balloon = open(store);
    let commitment = balloon.add(&[0x5a]).unwrap();

    assert_eq!(commitment.hyper_digest.as_bytes(), &[0x02]);

    let found = balloon.query_membership(&[0x5a], 0).unwrap();
    assert!(found.exists);
    assert_eq!(found.actual_version, 0);
    assert!(found.verify(&commitment, &commitment, 8, balloon.hasher().as_ref()).unwrap());

    let absent = balloon.query_membership(&[0x5b], 0).unwrap();
    assert!(!absent.exists);
    assert!(absent.verify(&commitment, &commitment, 8, balloon.hasher().as_ref()).unwrap());
}

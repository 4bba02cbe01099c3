//! Integration tests for node id allocation
//!
//! Released ids are reused; double release and foreign ids are rejected.

use trellis_foundation::{ErrorKind, NodeId};
use trellis_network::IdAllocator;

#[test]
fn ids_are_issued_densely() {
    let mut ids = IdAllocator::new();
    let issued: Vec<_> = (0..4).map(|_| ids.next_id()).collect();
    assert_eq!(
        issued,
        (0..4).map(NodeId::new).collect::<Vec<_>>()
    );
    assert_eq!(ids.len(), 4);
    assert_eq!(ids.high_water_mark(), 4);
}

#[test]
fn released_ids_are_reused() {
    let mut ids = IdAllocator::new();
    let a = ids.next_id();
    let _b = ids.next_id();
    ids.release_id(a).unwrap();
    assert!(!ids.is_allocated(a));

    let c = ids.next_id();
    assert_eq!(c, a);
    assert_eq!(ids.allocation_count(a), 2);
    assert_eq!(ids.high_water_mark(), 2);
}

#[test]
fn double_release_is_rejected() {
    let mut ids = IdAllocator::new();
    let a = ids.next_id();
    ids.release_id(a).unwrap();
    let err = ids.release_id(a).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IdAlreadyReleased(_)));
    assert!(err.is_contract_violation());
}

#[test]
fn foreign_ids_are_rejected() {
    let mut ids = IdAllocator::new();
    let err = ids.release_id(NodeId::new(99)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IdNeverAllocated(_)));
}

#[test]
fn iter_lists_live_ids() {
    let mut ids = IdAllocator::new();
    let a = ids.next_id();
    let b = ids.next_id();
    let c = ids.next_id();
    ids.release_id(b).unwrap();
    assert_eq!(ids.iter().collect::<Vec<_>>(), vec![a, c]);
}

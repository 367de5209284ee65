// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::vec::Vec;

use crate::error::KernelError;
use crate::root::*;
use crate::tests::fixtures::*;
use crate::types::{Revision, TreeId};

fn meta(fully: u64, partially: u64) -> MapRootMetadata {
    MapRootMetadata {
        source_log_id: TreeId(10),
        highest_fully_completed_seq: fully,
        highest_partially_completed_seq: partially,
    }
}

#[test]
fn test_first_log_root_is_revision_one() {
    let tree = log_tree(5);
    let root = LogRoot::next(&tree, None, hash(1), 0, T0).unwrap();
    assert_eq!(root.revision, Revision(1));
    assert_eq!(root.tree_id, TreeId(5));
    assert_eq!(root.tree_size, 0);
    assert_eq!(root.timestamp_nanos, T0);
}

#[test]
fn test_log_commit_scenario() {
    let tree = log_tree(5);
    let r1 = LogRoot::next(&tree, None, hash(1), 0, T0).unwrap();
    let r2 = LogRoot::next(&tree, Some(&r1), hash(2), 5, T0 + 1).unwrap();
    assert_eq!(r2.revision, Revision(2));
    assert_eq!(r2.tree_size, 5);

    let shrink = LogRoot::next(&tree, Some(&r2), hash(3), 3, T0 + 2);
    assert_eq!(shrink, Err(KernelError::NonMonotonicCommitment));

    let same_size = LogRoot::next(&tree, Some(&r2), hash(3), 5, T0 + 2).unwrap();
    assert_eq!(same_size.revision, Revision(3));
}

#[test]
fn test_timestamp_never_goes_backwards() {
    let tree = log_tree(5);
    let r1 = LogRoot::next(&tree, None, hash(1), 0, T0 + 100).unwrap();
    let r2 = LogRoot::next(&tree, Some(&r1), hash(2), 1, T0).unwrap();
    assert_eq!(r2.timestamp_nanos, T0 + 100);
}

#[test]
fn test_root_hash_length_follows_strategy() {
    let tree = log_tree(5);
    assert_eq!(
        LogRoot::next(&tree, None, vec![0u8; 20], 0, T0),
        Err(KernelError::InvalidRootHash { expected: 32, actual: 20 })
    );
}

#[test]
fn test_root_kind_must_match_tree() {
    let log = log_tree(1);
    let map = map_tree(2);
    assert!(MapRoot::next(&log, None, hash(1), meta(0, 0), T0).is_err());
    assert!(LogRoot::next(&map, None, hash(1), 0, T0).is_err());
}

#[test]
fn test_map_metadata_monotonicity() {
    let map = map_tree(2);
    let r1 = MapRoot::next(&map, None, hash(1), meta(3, 5), T0).unwrap();
    let r2 = MapRoot::next(&map, Some(&r1), hash(2), meta(5, 5), T0 + 1).unwrap();
    assert_eq!(r2.revision, Revision(2));

    assert_eq!(
        MapRoot::next(&map, Some(&r2), hash(3), meta(4, 9), T0 + 2),
        Err(KernelError::NonMonotonicCommitment)
    );
    assert_eq!(
        MapRoot::next(&map, Some(&r2), hash(3), meta(5, 4), T0 + 2),
        Err(KernelError::NonMonotonicCommitment)
    );

    let other_source = MapRootMetadata { source_log_id: TreeId(11), ..meta(6, 6) };
    assert_eq!(
        MapRoot::next(&map, Some(&r2), hash(3), other_source, T0 + 2),
        Err(KernelError::NonMonotonicCommitment)
    );
}

#[test]
fn test_canonical_bytes_layout() {
    let tree = log_tree(5);
    let root = LogRoot::next(&tree, None, hash(0xAB), 42, 7).unwrap();
    let bytes = root.canonical_bytes();

    assert_eq!(bytes.len(), 2 + 1 + 8 + 8 + 8 + 1 + 32 + 8);
    assert_eq!(&bytes[0..2], &1u16.to_be_bytes());
    assert_eq!(bytes[2], 1);
    assert_eq!(&bytes[3..11], &5i64.to_be_bytes());
    assert_eq!(&bytes[11..19], &1u64.to_be_bytes());
    assert_eq!(&bytes[19..27], &7u64.to_be_bytes());
    assert_eq!(bytes[27], 32);
    assert_eq!(&bytes[60..68], &42u64.to_be_bytes());
}

#[test]
fn test_canonical_bytes_bind_every_field() {
    let tree = log_tree(5);
    let base = LogRoot::next(&tree, None, hash(1), 10, T0).unwrap();

    let variants: Vec<LogRoot> = vec![
        LogRoot { tree_id: TreeId(6), ..base.clone() },
        LogRoot { revision: Revision(2), ..base.clone() },
        LogRoot { timestamp_nanos: T0 + 1, ..base.clone() },
        LogRoot { root_hash: hash(2), ..base.clone() },
        LogRoot { tree_size: 11, ..base.clone() },
    ];
    for variant in variants {
        assert_ne!(variant.canonical_bytes(), base.canonical_bytes());
    }
}

#[test]
fn test_log_and_map_encodings_are_domain_separated() {
    let log = LogRoot::next(&log_tree(5), None, hash(1), 0, T0).unwrap();
    let map = MapRoot::next(&map_tree(5), None, hash(1), MapRootMetadata::default(), T0).unwrap();
    assert_ne!(&log.canonical_bytes()[..28], &map.canonical_bytes()[..28]);
}

#[test]
fn test_audit_log_chain() {
    let tree = log_tree(5);
    let r1 = LogRoot::next(&tree, None, hash(1), 0, T0).unwrap();
    let r2 = LogRoot::next(&tree, Some(&r1), hash(2), 4, T0).unwrap();
    let r3 = LogRoot::next(&tree, Some(&r2), hash(3), 9, T0).unwrap();

    assert!(audit_log_chain(TreeId(5), &[r1.clone(), r2.clone(), r3.clone()]).is_ok());
    assert_eq!(
        audit_log_chain(TreeId(5), &[r1.clone(), r3.clone()]),
        Err(ChainViolation::RevisionGap { index: 1, expected: Revision(2), found: Revision(3) })
    );

    let shrunk = LogRoot { tree_size: 1, ..r3 };
    assert_eq!(
        audit_log_chain(TreeId(5), &[r1.clone(), r2, shrunk]),
        Err(ChainViolation::Regression { index: 2 })
    );
    assert_eq!(audit_log_chain(TreeId(6), &[r1]), Err(ChainViolation::ForeignRoot { index: 0 }));
}

#[test]
fn test_audit_map_chain() {
    let map = map_tree(2);
    let r1 = MapRoot::next(&map, None, hash(1), meta(1, 1), T0).unwrap();
    let r2 = MapRoot::next(&map, Some(&r1), hash(2), meta(2, 3), T0).unwrap();
    assert!(audit_map_chain(TreeId(2), &[r1.clone(), r2.clone()]).is_ok());

    let regressed = MapRoot { metadata: meta(0, 3), ..r2 };
    assert_eq!(audit_map_chain(TreeId(2), &[r1, regressed]), Err(ChainViolation::Regression { index: 1 }));
}

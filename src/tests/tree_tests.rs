// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::string::ToString;

use crate::error::KernelError;
use crate::keys::PrivateKeyRef;
use crate::tests::fixtures::*;
use crate::tree::TreeUpdate;
use crate::types::*;

#[test]
fn test_create_initial_state() {
    let tree = log_tree(7);
    assert_eq!(tree.tree_id, TreeId(7));
    assert_eq!(tree.tree_state, TreeState::Active);
    assert_eq!(tree.create_time, T0);
    assert_eq!(tree.update_time, T0);
    assert_eq!(tree.delete_time, None);
    assert!(tree.private_key.is_some());
}

#[test]
fn test_redacted_hides_key() {
    let tree = log_tree(1);
    let view = tree.redacted();
    assert!(view.private_key.is_none());
    assert_eq!(view.tree_id, tree.tree_id);
    assert_eq!(view.display_name, tree.display_name);
}

#[test]
fn test_key_debug_redacts_secrets() {
    let key = PrivateKeyRef::PemFile {
        path: "/keys/a.pem".to_string(),
        password: Some("hunter2".to_string()),
    };
    let printed = format!("{:?}", key);
    assert!(printed.contains("/keys/a.pem"));
    assert!(!printed.contains("hunter2"));

    let inline = PrivateKeyRef::PrivateKey { der: vec![1, 2, 3, 4] };
    assert!(format!("{:?}", inline).contains("4 bytes redacted"));
}

#[test]
fn test_update_mutable_fields() {
    let mut tree = log_tree(1);
    let update = TreeUpdate {
        display_name: Some("renamed".to_string()),
        description: Some("new description".to_string()),
        ..Default::default()
    };

    tree.apply_update(update, T0 + 10).unwrap();
    assert_eq!(tree.display_name, "renamed");
    assert_eq!(tree.description, "new description");
    assert_eq!(tree.update_time, T0 + 10);
    assert_eq!(tree.create_time, T0);
}

#[test]
fn test_update_rejects_immutable_fields() {
    let original = log_tree(1);

    let attempts = [
        TreeUpdate { tree_type: Some(TreeType::Map), ..Default::default() },
        TreeUpdate { hash_strategy: Some(HashStrategy::ObjectRfc6962Sha256), ..Default::default() },
        TreeUpdate { hash_algorithm: Some(HashAlgorithm::Sha256), ..Default::default() },
        TreeUpdate { signature_algorithm: Some(SignatureAlgorithm::Ecdsa), ..Default::default() },
        TreeUpdate { duplicate_policy: Some(DuplicatePolicy::Allowed), ..Default::default() },
        TreeUpdate { tree_id: Some(TreeId(99)), ..Default::default() },
        TreeUpdate {
            create_time: Some(0),
            display_name: Some("sneaky".to_string()),
            ..Default::default()
        },
    ];

    for update in attempts {
        let mut tree = original.clone();
        match tree.apply_update(update, T0 + 1) {
            Err(KernelError::ImmutableField(_)) => {}
            other => panic!("expected ImmutableField, got {:?}", other),
        }
        assert_eq!(tree, original, "rejected update must not change the tree");
    }
}

#[test]
fn test_empty_update_rejected() {
    let mut tree = log_tree(1);
    assert!(matches!(
        tree.apply_update(TreeUpdate::default(), T0 + 1),
        Err(KernelError::InvalidArgument(_))
    ));
}

#[test]
fn test_update_time_strictly_increases_with_stuck_clock() {
    let mut tree = log_tree(1);
    for i in 0..3 {
        let before = tree.update_time;
        let update = TreeUpdate { description: Some(format!("rev {}", i)), ..Default::default() };
        tree.apply_update(update, T0).unwrap();
        assert!(tree.update_time > before);
    }
}

#[test]
fn test_update_freeze_and_unfreeze() {
    let mut tree = log_tree(1);
    let freeze = TreeUpdate { tree_state: Some(TreeState::Frozen), ..Default::default() };
    tree.apply_update(freeze, T0 + 1).unwrap();
    assert_eq!(tree.tree_state, TreeState::Frozen);
    assert_eq!(tree.ensure_writable(), Err(KernelError::TreeFrozen));
    assert!(tree.ensure_readable().is_ok());

    let thaw = TreeUpdate { tree_state: Some(TreeState::Active), ..Default::default() };
    tree.apply_update(thaw, T0 + 2).unwrap();
    assert!(tree.ensure_writable().is_ok());
}

#[test]
fn test_update_cannot_delete() {
    let mut tree = log_tree(1);
    let update = TreeUpdate { tree_state: Some(TreeState::HardDeleted), ..Default::default() };
    assert!(matches!(
        tree.apply_update(update, T0 + 1),
        Err(KernelError::IllegalTransition { .. })
    ));
    assert_eq!(tree.tree_state, TreeState::Active);
}

#[test]
fn test_rotate_key_reference() {
    let mut tree = log_tree(1);
    let key = PrivateKeyRef::PrivateKey { der: vec![9; 48] };
    let update = TreeUpdate { private_key: Some(key.clone()), ..Default::default() };
    tree.apply_update(update, T0 + 1).unwrap();
    assert_eq!(tree.private_key, Some(key));
}

#[test]
fn test_deleted_tree_rejects_updates() {
    let mut tree = log_tree(1);
    tree.tree_state = TreeState::SoftDeleted;
    let update = TreeUpdate { display_name: Some("x".to_string()), ..Default::default() };
    assert_eq!(tree.apply_update(update, T0 + 1), Err(KernelError::TreeNotFound));
}

#[test]
fn test_ensure_type() {
    assert!(log_tree(1).ensure_type(TreeType::Log).is_ok());
    assert!(log_tree(1).ensure_type(TreeType::Map).is_err());
    assert!(map_tree(2).ensure_type(TreeType::Map).is_ok());
}

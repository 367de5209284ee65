// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use std::sync::Arc;
use std::time::Duration;

use arbor_kernel::types::*;
use arbor_kernel::{MapRootMetadata, TreeUpdate};
use arbor_node::errors::ServiceError;
use arbor_node::registry::ServiceSettings;
use arbor_node::signer::{Signer, SignerError, SignerFactory};
use arbor_node::storage::{MemoryStorage, RootStorage, StorageHandles};
use async_trait::async_trait;
use common::*;
use ed25519_dalek::{Signature, Verifier};

async fn set_state(h: &Harness, id: TreeId, state: TreeState) {
    h.admin()
        .update_tree(
            id,
            TreeUpdate {
                tree_state: Some(state),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_log_commit_sequence() {
    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();
    let logs = h.logs();

    let r1 = logs.commit_root(tree.tree_id, hash(1), 0).await.unwrap();
    assert_eq!(r1.revision(), Revision(1));
    assert_eq!(r1.root.tree_size, 0);
    assert_eq!(r1.root.timestamp_nanos, T0);

    h.tick();
    let r2 = logs.commit_root(tree.tree_id, hash(2), 5).await.unwrap();
    assert_eq!(r2.revision(), Revision(2));
    assert_eq!(r2.root.tree_size, 5);
    assert!(r2.root.timestamp_nanos > r1.root.timestamp_nanos);

    // A shrinking tree is rejected and nothing is stored.
    let err = logs.commit_root(tree.tree_id, hash(3), 3).await.unwrap_err();
    assert_eq!(err.code(), "NON_MONOTONIC_COMMITMENT");
    assert_eq!(logs.latest_root(tree.tree_id).await.unwrap(), r2);

    assert_eq!(logs.root_at(tree.tree_id, Revision(1)).await.unwrap(), r1);
    assert_eq!(
        logs.root_at(tree.tree_id, Revision(3)).await.unwrap_err().code(),
        "ROOT_NOT_FOUND"
    );
}

#[tokio::test]
async fn test_signature_covers_canonical_bytes() {
    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();
    let root = h.logs().commit_root(tree.tree_id, hash(9), 12).await.unwrap();

    assert_eq!(root.signature.signature_algorithm, SignatureAlgorithm::Ed25519);
    assert_eq!(root.signature.hash_algorithm, HashAlgorithm::Sha512);

    let signature = Signature::from_slice(&root.signature.signature).unwrap();
    let public = signing_key().verifying_key();
    assert!(public.verify(&root.root.canonical_bytes(), &signature).is_ok());

    // Any field change breaks the signature.
    let mut tampered = root.root.clone();
    tampered.tree_size += 1;
    assert!(public.verify(&tampered.canonical_bytes(), &signature).is_err());
}

#[tokio::test]
async fn test_clock_going_backwards_keeps_timestamps_ordered() {
    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();
    let logs = h.logs();

    let r1 = logs.commit_root(tree.tree_id, hash(1), 1).await.unwrap();
    h.clock.set(T0 - 1_000);
    let r2 = logs.commit_root(tree.tree_id, hash(2), 2).await.unwrap();
    assert!(r2.root.timestamp_nanos >= r1.root.timestamp_nanos);
}

#[tokio::test]
async fn test_root_hash_length_enforced() {
    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();
    let err = h.logs().commit_root(tree.tree_id, vec![1u8; 20], 1).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_ROOT_HASH");
    assert_eq!(h.logs().latest_root(tree.tree_id).await.unwrap_err().code(), "ROOT_NOT_FOUND");
}

#[tokio::test]
async fn test_frozen_log_refuses_commits_until_unfrozen() {
    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();
    let logs = h.logs();
    let r1 = logs.commit_root(tree.tree_id, hash(1), 1).await.unwrap();

    set_state(&h, tree.tree_id, TreeState::Frozen).await;
    let err = logs.commit_root(tree.tree_id, hash(2), 2).await.unwrap_err();
    assert_eq!(err.code(), "TREE_FROZEN");

    // Reads keep working while frozen.
    assert_eq!(logs.latest_root(tree.tree_id).await.unwrap(), r1);

    set_state(&h, tree.tree_id, TreeState::Active).await;
    let r2 = logs.commit_root(tree.tree_id, hash(2), 2).await.unwrap();
    assert_eq!(r2.revision(), Revision(2));
}

#[tokio::test]
async fn test_deleted_log_is_invisible_until_undeleted() {
    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();
    let logs = h.logs();
    let r1 = logs.commit_root(tree.tree_id, hash(1), 1).await.unwrap();

    h.admin().delete_tree(tree.tree_id).await.unwrap();
    assert_eq!(logs.latest_root(tree.tree_id).await.unwrap_err().code(), "TREE_NOT_FOUND");
    assert_eq!(
        logs.commit_root(tree.tree_id, hash(2), 2).await.unwrap_err().code(),
        "TREE_NOT_FOUND"
    );

    h.admin().undelete_tree(tree.tree_id).await.unwrap();
    assert_eq!(logs.latest_root(tree.tree_id).await.unwrap(), r1);
    let r2 = logs.commit_root(tree.tree_id, hash(2), 2).await.unwrap();
    assert_eq!(r2.revision(), Revision(2));
}

#[tokio::test]
async fn test_hard_delete_drops_roots() {
    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();
    h.logs().commit_root(tree.tree_id, hash(1), 1).await.unwrap();

    h.admin().delete_tree(tree.tree_id).await.unwrap();
    h.admin().hard_delete_tree(tree.tree_id).await.unwrap();

    let roots = &h.registry.root_storage;
    assert_eq!(roots.latest_log_root(tree.tree_id).await.unwrap(), None);
}

#[tokio::test]
async fn test_wrong_tree_type() {
    let h = Harness::new();
    let log = h.admin().create_tree(log_spec()).await.unwrap();
    let map = h.admin().create_tree(map_spec()).await.unwrap();

    let err = h.maps().commit_root(log.tree_id, hash(1), MapRootMetadata::default()).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
    let err = h.logs().commit_root(map.tree_id, hash(1), 1).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_map_commit_sequence() {
    let h = Harness::new();
    let log = h.admin().create_tree(log_spec()).await.unwrap();
    let map = h.admin().create_tree(map_spec()).await.unwrap();
    let maps = h.maps();

    let progress = |fully, partially| MapRootMetadata {
        source_log_id: log.tree_id,
        highest_fully_completed_seq: fully,
        highest_partially_completed_seq: partially,
    };

    let r1 = maps.commit_root(map.tree_id, hash(1), progress(0, 4)).await.unwrap();
    assert_eq!(r1.revision(), Revision(1));
    let r2 = maps.commit_root(map.tree_id, hash(2), progress(4, 9)).await.unwrap();
    assert_eq!(r2.revision(), Revision(2));
    assert_eq!(r2.root.metadata, progress(4, 9));

    let err = maps.commit_root(map.tree_id, hash(3), progress(3, 9)).await.unwrap_err();
    assert_eq!(err.code(), "NON_MONOTONIC_COMMITMENT");

    let mut other_source = progress(5, 10);
    other_source.source_log_id = TreeId(77);
    let err = maps.commit_root(map.tree_id, hash(3), other_source).await.unwrap_err();
    assert_eq!(err.code(), "NON_MONOTONIC_COMMITMENT");

    assert_eq!(maps.latest_root(map.tree_id).await.unwrap(), r2);
    assert_eq!(maps.root_at(map.tree_id, Revision(1)).await.unwrap(), r1);

    let signature = Signature::from_slice(&r2.signature.signature).unwrap();
    assert!(signing_key()
        .verifying_key()
        .verify(&r2.root.canonical_bytes(), &signature)
        .is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commits_never_share_a_revision() {
    const WRITERS: u64 = 8;

    let h = Harness::new();
    let tree = h.admin().create_tree(log_spec()).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..WRITERS {
        let logs = h.logs();
        let id = tree.tree_id;
        tasks.push(tokio::spawn(async move {
            // Same size for everyone so only revision races can fail.
            loop {
                match logs.commit_root(id, hash(i as u8), 10).await {
                    Ok(root) => return root.revision(),
                    Err(ServiceError::RevisionConflict { .. }) => tokio::task::yield_now().await,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }));
    }

    let mut revisions = Vec::new();
    for task in tasks {
        revisions.push(task.await.unwrap().0);
    }
    revisions.sort_unstable();
    assert_eq!(revisions, (1..=WRITERS).collect::<Vec<_>>());

    let logs = h.logs();
    for revision in 1..=WRITERS {
        let root = logs.root_at(tree.tree_id, Revision(revision)).await.unwrap();
        assert_eq!(root.revision(), Revision(revision));
    }
}

/// Ed25519 signer that claims the wrong digest.
struct Sha256Ed25519Signer;

#[async_trait]
impl Signer for Sha256Ed25519Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn public_key(&self) -> Vec<u8> {
        signing_key().verifying_key().to_bytes().to_vec()
    }

    async fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(vec![0u8; 64])
    }
}

struct Sha256SignerFactory;

#[async_trait]
impl SignerFactory for Sha256SignerFactory {
    async fn new_signer(&self, _key: &arbor_kernel::PrivateKeyRef) -> Result<Arc<dyn Signer>, SignerError> {
        Ok(Arc::new(Sha256Ed25519Signer))
    }
}

#[tokio::test]
async fn test_signer_digest_must_match_tree() {
    let h = Harness::build(
        StorageHandles::from_store(Arc::new(MemoryStorage::new())),
        Arc::new(Sha256SignerFactory),
        ServiceSettings::default(),
    );
    let tree = h.admin().create_tree(log_spec()).await.unwrap();

    let err = h.logs().commit_root(tree.tree_id, hash(1), 1).await.unwrap_err();
    assert_eq!(err.code(), "SIGNING_FAILURE");
    assert!(err.to_string().contains("Sha256"));
    assert_eq!(h.logs().latest_root(tree.tree_id).await.unwrap_err().code(), "ROOT_NOT_FOUND");
}

#[tokio::test]
async fn test_hung_signer_times_out() {
    let h = Harness::build(
        StorageHandles::from_store(Arc::new(MemoryStorage::new())),
        Arc::new(StuckSignerFactory),
        ServiceSettings {
            soft_delete_retention: RETENTION,
            rpc_timeout: Duration::from_millis(50),
        },
    );
    let tree = h.admin().create_tree(log_spec()).await.unwrap();

    let err = h.logs().commit_root(tree.tree_id, hash(1), 1).await.unwrap_err();
    assert_eq!(err.code(), "SIGNING_FAILURE");
    assert_eq!(h.logs().latest_root(tree.tree_id).await.unwrap_err().code(), "ROOT_NOT_FOUND");
}

#[tokio::test]
async fn test_key_removed_after_create_fails_signing() {
    use ed25519_dalek::pkcs8::{EncodePrivateKey, LineEnding};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.pem");
    std::fs::write(&path, signing_key().to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes()).unwrap();

    let h = Harness::new();
    let mut spec = log_spec();
    spec.private_key = arbor_kernel::PrivateKeyRef::PemFile {
        path: path.display().to_string(),
        password: None,
    };
    let tree = h.admin().create_tree(spec).await.unwrap();
    h.logs().commit_root(tree.tree_id, hash(1), 1).await.unwrap();

    std::fs::remove_file(&path).unwrap();
    let err = h.logs().commit_root(tree.tree_id, hash(2), 2).await.unwrap_err();
    assert_eq!(err.code(), "SIGNING_FAILURE");
    assert_eq!(h.logs().latest_root(tree.tree_id).await.unwrap().revision(), Revision(1));
}

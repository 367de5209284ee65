// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arbor_kernel::{NewTree, Revision, SignedLogRoot, SignedMapRoot, Tree, TreeId};
use arbor_node::bootstrap::{self, BootstrapError};
use arbor_node::registry::ServiceSettings;
use arbor_node::signer::KeyFileSignerFactory;
use arbor_node::storage::{AdminStorage, MemoryStorage, RootStorage, StorageError, StorageHandles, TreeMutator};
use async_trait::async_trait;
use common::*;

/// Storage whose backend is unreachable.
struct DownStorage;

fn down<T>() -> Result<T, StorageError> {
    Err(StorageError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl AdminStorage for DownStorage {
    async fn check_connection(&self) -> Result<(), StorageError> {
        down()
    }
    async fn create_tree(&self, _spec: NewTree, _now: u64) -> Result<Tree, StorageError> {
        down()
    }
    async fn get_tree(&self, _id: TreeId) -> Result<Tree, StorageError> {
        down()
    }
    async fn list_trees(&self) -> Result<Vec<Tree>, StorageError> {
        down()
    }
    async fn update_tree(&self, _id: TreeId, _mutate: TreeMutator) -> Result<Tree, StorageError> {
        down()
    }
}

#[async_trait]
impl RootStorage for DownStorage {
    async fn check_connection(&self) -> Result<(), StorageError> {
        down()
    }
    async fn latest_log_root(&self, _id: TreeId) -> Result<Option<SignedLogRoot>, StorageError> {
        down()
    }
    async fn log_root_at(&self, _id: TreeId, _revision: Revision) -> Result<Option<SignedLogRoot>, StorageError> {
        down()
    }
    async fn store_log_root(&self, _expected: Revision, _root: SignedLogRoot) -> Result<(), StorageError> {
        down()
    }
    async fn latest_map_root(&self, _id: TreeId) -> Result<Option<SignedMapRoot>, StorageError> {
        down()
    }
    async fn map_root_at(&self, _id: TreeId, _revision: Revision) -> Result<Option<SignedMapRoot>, StorageError> {
        down()
    }
    async fn store_map_root(&self, _expected: Revision, _root: SignedMapRoot) -> Result<(), StorageError> {
        down()
    }
}

fn loopback() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
}

#[tokio::test]
async fn test_unhealthy_storage_aborts_before_binding() {
    // Reserve a port, then free it so the server could take it.
    let addr = std::net::TcpListener::bind(loopback()).unwrap().local_addr().unwrap();

    let h = Harness::build(
        StorageHandles::from_store(Arc::new(DownStorage)),
        Arc::new(KeyFileSignerFactory),
        ServiceSettings::default(),
    );
    let result = bootstrap::serve(h.registry.clone(), addr, None, Duration::from_secs(1), std::future::pending()).await;

    match result {
        Err(BootstrapError::Unhealthy(e)) => assert_eq!(e.code(), "STORAGE_FAILURE"),
        other => panic!("expected health failure, got {:?}", other),
    }
    // The port was never taken.
    assert!(std::net::TcpListener::bind(addr).is_ok());
}

#[tokio::test]
async fn test_port_in_use_fails_startup() {
    let taken = std::net::TcpListener::bind(loopback()).unwrap();
    let addr = taken.local_addr().unwrap();

    let h = Harness::new();
    let result = bootstrap::serve(h.registry.clone(), addr, None, Duration::from_secs(1), std::future::pending()).await;
    assert!(matches!(result, Err(BootstrapError::Bind { .. })));
}

#[tokio::test]
async fn test_shutdown_signal_stops_server() {
    let h = Harness::new();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(bootstrap::serve(
        h.registry.clone(),
        loopback(),
        Some(Duration::from_secs(60)),
        Duration::from_secs(1),
        async move {
            let _ = rx.await;
        },
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert!(result.is_ok());
}

async fn connect(addr: SocketAddr) -> tokio::net::TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = tokio::net::TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server never started listening on {}", addr);
}

#[tokio::test]
async fn test_grace_period_bounds_stuck_requests() {
    use tokio::io::AsyncWriteExt;

    let addr = std::net::TcpListener::bind(loopback()).unwrap().local_addr().unwrap();
    let h = Harness::build(
        StorageHandles::from_store(Arc::new(MemoryStorage::new())),
        Arc::new(StuckSignerFactory),
        ServiceSettings {
            soft_delete_retention: RETENTION,
            rpc_timeout: Duration::from_secs(60),
        },
    );
    let tree = h.admin().create_tree(log_spec()).await.unwrap();

    let grace = Duration::from_millis(300);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(bootstrap::serve(h.registry.clone(), addr, None, grace, async move {
        let _ = rx.await;
    }));

    // A commit that hangs in the signer for far longer than the grace period.
    let body = format!(r#"{{"root_hash":"{}","tree_size":1}}"#, hex::encode(hash(1)));
    let request = format!(
        "POST /v1/logs/{}/roots HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
        tree.tree_id.0,
        body.len(),
        body
    );
    let mut stream = connect(addr).await;
    stream.write_all(request.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let fired = Instant::now();
    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("serve kept waiting on the stuck request")
        .unwrap();
    let waited = fired.elapsed();

    assert!(result.is_ok());
    // It waited for the in-flight request, but only for the grace period.
    assert!(waited >= grace, "returned after {:?}", waited);
    assert!(waited < Duration::from_secs(3), "returned after {:?}", waited);
    assert_eq!(h.logs().latest_root(tree.tree_id).await.unwrap_err().code(), "ROOT_NOT_FOUND");
}

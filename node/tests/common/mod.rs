// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use arbor_kernel::types::*;
use arbor_kernel::{NewTree, PrivateKeyRef};
use arbor_node::admin::AdminServer;
use arbor_node::clock::FakeTimeSource;
use arbor_node::log_server::LogServer;
use arbor_node::map_server::MapServer;
use arbor_node::registry::{Registry, ServiceSettings};
use arbor_node::signer::{KeyFileSignerFactory, Signer, SignerError, SignerFactory};
use arbor_node::storage::{MemoryStorage, StorageHandles};
use async_trait::async_trait;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::SigningKey;

pub const T0: u64 = 1_700_000_000_000_000_000;
pub const RETENTION: Duration = Duration::from_secs(3600);

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

pub fn key_ref() -> PrivateKeyRef {
    let der = signing_key().to_pkcs8_der().unwrap();
    PrivateKeyRef::PrivateKey {
        der: der.as_bytes().to_vec(),
    }
}

pub fn log_spec() -> NewTree {
    NewTree {
        tree_type: TreeType::Log,
        hash_strategy: HashStrategy::Rfc6962Sha256,
        hash_algorithm: HashAlgorithm::Sha512,
        signature_algorithm: SignatureAlgorithm::Ed25519,
        duplicate_policy: DuplicatePolicy::NotAllowed,
        display_name: "ct-log".to_string(),
        description: "integration log".to_string(),
        private_key: key_ref(),
    }
}

pub fn map_spec() -> NewTree {
    NewTree {
        tree_type: TreeType::Map,
        hash_strategy: HashStrategy::ConiksSha512_256,
        display_name: "kt-map".to_string(),
        ..log_spec()
    }
}

pub fn hash(b: u8) -> Vec<u8> {
    vec![b; 32]
}

/// Servers wired to one registry with a hand-driven clock.
pub struct Harness {
    pub registry: Registry,
    pub clock: Arc<FakeTimeSource>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(StorageHandles::from_store(Arc::new(MemoryStorage::new())))
    }

    pub fn with_storage(storage: StorageHandles) -> Self {
        Self::build(storage, Arc::new(KeyFileSignerFactory), ServiceSettings {
            soft_delete_retention: RETENTION,
            rpc_timeout: Duration::from_secs(5),
        })
    }

    pub fn build(storage: StorageHandles, signers: Arc<dyn SignerFactory>, settings: ServiceSettings) -> Self {
        let clock = Arc::new(FakeTimeSource::new(T0));
        let registry = Registry::new(storage, signers, clock.clone(), settings);
        Self { registry, clock }
    }

    pub fn admin(&self) -> AdminServer {
        AdminServer::new(self.registry.clone())
    }

    pub fn logs(&self) -> LogServer {
        LogServer::new(self.registry.clone())
    }

    pub fn maps(&self) -> MapServer {
        MapServer::new(self.registry.clone())
    }

    pub fn tick(&self) {
        self.clock.advance(Duration::from_millis(1));
    }
}

/// Resolves every key to a signer that never answers.
pub struct StuckSignerFactory;

struct StuckSigner;

#[async_trait]
impl Signer for StuckSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha512
    }

    fn public_key(&self) -> Vec<u8> {
        vec![0u8; 32]
    }

    async fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, SignerError> {
        std::future::pending().await
    }
}

#[async_trait]
impl SignerFactory for StuckSignerFactory {
    async fn new_signer(&self, _key: &arbor_kernel::PrivateKeyRef) -> Result<Arc<dyn Signer>, SignerError> {
        Ok(Arc::new(StuckSigner))
    }
}

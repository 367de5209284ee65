// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Process-wide collaborators, built once at startup and handed to every
//! server explicitly.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arbor_kernel::{DigitallySigned, PrivateKeyRef, Tree};

use crate::clock::TimeSource;
use crate::errors::ServiceError;
use crate::signer::{Signer, SignerFactory};
use crate::storage::{AdminStorage, RootStorage, StorageError, StorageHandles};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// How long a soft-deleted tree can still be undeleted.
    pub soft_delete_retention: Duration,
    /// Upper bound on any single storage or signer call.
    pub rpc_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            soft_delete_retention: Duration::from_secs(7 * 24 * 3600),
            rpc_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Clone)]
pub struct Registry {
    pub admin_storage: Arc<dyn AdminStorage>,
    pub root_storage: Arc<dyn RootStorage>,
    pub signer_factory: Arc<dyn SignerFactory>,
    pub time_source: Arc<dyn TimeSource>,
    pub settings: ServiceSettings,
}

impl Registry {
    pub fn new(
        storage: StorageHandles,
        signer_factory: Arc<dyn SignerFactory>,
        time_source: Arc<dyn TimeSource>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            admin_storage: storage.admin,
            root_storage: storage.roots,
            signer_factory,
            time_source,
            settings,
        }
    }

    pub fn now(&self) -> u64 {
        self.time_source.now_nanos()
    }

    /// Retention in nanoseconds; saturates so a very long retention means "forever".
    pub fn retention_nanos(&self) -> u64 {
        u64::try_from(self.settings.soft_delete_retention.as_nanos()).unwrap_or(u64::MAX)
    }

    /// Run a storage call under `rpc_timeout`.
    pub(crate) async fn storage_call<T, F>(&self, what: &'static str, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.settings.rpc_timeout, call).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => {
                tracing::warn!("Storage call {} timed out", what);
                Err(ServiceError::Storage(format!(
                    "{} timed out after {:?}",
                    what, self.settings.rpc_timeout
                )))
            }
        }
    }

    pub(crate) async fn resolve_signer(&self, key: &PrivateKeyRef) -> Result<Arc<dyn Signer>, ServiceError> {
        match tokio::time::timeout(self.settings.rpc_timeout, self.signer_factory.new_signer(key)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ServiceError::SigningFailure(format!(
                "key resolution timed out after {:?}",
                self.settings.rpc_timeout
            ))),
        }
    }

    /// Sign canonical root bytes with the tree's own key and scheme.
    pub(crate) async fn sign_root(&self, tree: &Tree, message: &[u8]) -> Result<DigitallySigned, ServiceError> {
        let key = tree
            .private_key
            .as_ref()
            .ok_or_else(|| ServiceError::SigningFailure("tree has no signing key".to_string()))?;
        let signer = self.resolve_signer(key).await?;
        if signer.algorithm() != tree.signature_algorithm {
            return Err(ServiceError::SigningFailure(format!(
                "key is {:?} but tree {} requires {:?}",
                signer.algorithm(),
                tree.tree_id,
                tree.signature_algorithm
            )));
        }
        if signer.hash_algorithm() != tree.hash_algorithm {
            return Err(ServiceError::SigningFailure(format!(
                "signer hashes with {:?} but tree {} requires {:?}",
                signer.hash_algorithm(),
                tree.tree_id,
                tree.hash_algorithm
            )));
        }

        let start = Instant::now();
        let signature = match tokio::time::timeout(self.settings.rpc_timeout, signer.sign(message)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ServiceError::SigningFailure(format!(
                    "signing timed out after {:?}",
                    self.settings.rpc_timeout
                )))
            }
        };
        metrics::histogram!("arbor_sign_duration_seconds", start.elapsed().as_secs_f64());

        Ok(DigitallySigned {
            hash_algorithm: tree.hash_algorithm,
            signature_algorithm: tree.signature_algorithm,
            signature,
        })
    }
}

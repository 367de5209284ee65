// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Storage collaborators.
//!
//! Two seams: [`AdminStorage`] owns tree records, [`RootStorage`] owns the
//! per-tree sequence of signed roots. Both backends implement both traits
//! over one shared state so tree state and root writes can be checked in a
//! single transaction.
//!
//! # Invariants
//! - Tree ids are allocated by storage and never reused, not even after a
//!   hard delete (the tree stays behind as a tombstone)
//! - A root is stored only if the latest revision equals the caller's
//!   expected previous revision AND the tree is ACTIVE at write time
//! - A failed call leaves nothing visible

pub mod file;
pub mod memory;
mod state;

use std::sync::Arc;

use arbor_kernel::{KernelError, NewTree, Revision, SignedLogRoot, SignedMapRoot, Tree, TreeId, TreeState};
use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("tree {0} not found")]
    NotFound(TreeId),
    #[error("tree {id} is {state:?} and cannot accept roots")]
    NotWritable { id: TreeId, state: TreeState },
    #[error("revision conflict: expected latest revision {expected}, found {current}")]
    Conflict { expected: Revision, current: Revision },
    #[error("update rejected: {0}")]
    Rejected(KernelError),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage I/O failure: {0}")]
    Io(String),
}

/// Read-modify-write step run inside the storage transaction. Returning an
/// error aborts the transaction without writing anything.
pub type TreeMutator = Box<dyn FnOnce(&mut Tree) -> Result<(), KernelError> + Send>;

#[async_trait]
pub trait AdminStorage: Send + Sync {
    async fn check_connection(&self) -> Result<(), StorageError>;

    /// Allocate a fresh id and persist the new tree as ACTIVE.
    async fn create_tree(&self, spec: NewTree, now: u64) -> Result<Tree, StorageError>;

    /// Returns the tree in whatever state it is in; visibility rules belong
    /// to the caller.
    async fn get_tree(&self, id: TreeId) -> Result<Tree, StorageError>;

    async fn list_trees(&self) -> Result<Vec<Tree>, StorageError>;

    /// Transactional update. A post-image in HARD_DELETED also purges every
    /// root of the tree.
    async fn update_tree(&self, id: TreeId, mutate: TreeMutator) -> Result<Tree, StorageError>;
}

#[async_trait]
pub trait RootStorage: Send + Sync {
    async fn check_connection(&self) -> Result<(), StorageError>;

    async fn latest_log_root(&self, id: TreeId) -> Result<Option<SignedLogRoot>, StorageError>;
    async fn log_root_at(&self, id: TreeId, revision: Revision) -> Result<Option<SignedLogRoot>, StorageError>;
    /// Conditional write; see the module invariants.
    async fn store_log_root(&self, expected_previous: Revision, root: SignedLogRoot) -> Result<(), StorageError>;

    async fn latest_map_root(&self, id: TreeId) -> Result<Option<SignedMapRoot>, StorageError>;
    async fn map_root_at(&self, id: TreeId, revision: Revision) -> Result<Option<SignedMapRoot>, StorageError>;
    async fn store_map_root(&self, expected_previous: Revision, root: SignedMapRoot) -> Result<(), StorageError>;
}

/// The two storage seams, usually backed by the same object.
#[derive(Clone)]
pub struct StorageHandles {
    pub admin: Arc<dyn AdminStorage>,
    pub roots: Arc<dyn RootStorage>,
}

impl StorageHandles {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AdminStorage + RootStorage + 'static,
    {
        Self {
            admin: store.clone(),
            roots: store,
        }
    }
}

/// Open the backend named by `uri`: `memory://` or `file://<path>`.
pub fn open_storage(uri: &str) -> Result<StorageHandles, StorageError> {
    if uri == "memory://" {
        tracing::warn!("Using in-memory storage; nothing survives a restart");
        return Ok(StorageHandles::from_store(Arc::new(MemoryStorage::new())));
    }
    if let Some(path) = uri.strip_prefix("file://") {
        if path.is_empty() {
            return Err(StorageError::Unavailable("file:// URI has no path".to_string()));
        }
        let store = FileStorage::open(path)?;
        return Ok(StorageHandles::from_store(Arc::new(store)));
    }
    Err(StorageError::Unavailable(format!("unsupported storage URI: {}", uri)))
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Mutex-guarded storage engine shared by the memory and file backends.
//!
//! # Commit protocol
//! ```text
//! lock -> prepare (validate, build record) -> journal.persist -> apply -> unlock
//! ```
//! Nothing between `persist` and `apply` awaits, so a caller that gives up
//! (timeout, dropped request) can never leave a persisted-but-invisible or
//! visible-but-unpersisted change behind.

use arbor_kernel::{NewTree, Revision, SignedLogRoot, SignedMapRoot, Tree, TreeId};
use arbor_persistence::StorageRecord;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::state::StorageState;
use super::{AdminStorage, RootStorage, StorageError, TreeMutator};

/// Where accepted records go before they become visible.
pub trait Journal: Send + 'static {
    fn persist(&mut self, record: &StorageRecord) -> Result<(), StorageError>;
}

/// No durability at all.
#[derive(Debug, Default)]
pub struct Volatile;

impl Journal for Volatile {
    fn persist(&mut self, _record: &StorageRecord) -> Result<(), StorageError> {
        Ok(())
    }
}

struct Inner<J> {
    state: StorageState,
    journal: J,
}

pub struct StateStore<J> {
    inner: Mutex<Inner<J>>,
}

pub type MemoryStorage = StateStore<Volatile>;

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_state(StorageState::default(), Volatile)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: Journal> StateStore<J> {
    pub(crate) fn with_state(state: StorageState, journal: J) -> Self {
        Self {
            inner: Mutex::new(Inner { state, journal }),
        }
    }

    async fn commit<T, F>(&self, prepare: F) -> Result<T, StorageError>
    where
        F: FnOnce(&StorageState) -> Result<(StorageRecord, T), StorageError> + Send,
        T: Send,
    {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let (record, output) = prepare(&inner.state)?;
        inner.journal.persist(&record)?;
        tracing::debug!("Storage commit: {}", record.label());
        inner.state.apply(record);
        Ok(output)
    }

    async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&StorageState) -> T + Send,
    {
        let guard = self.inner.lock().await;
        f(&guard.state)
    }
}

#[async_trait]
impl<J: Journal> AdminStorage for StateStore<J> {
    async fn check_connection(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn create_tree(&self, spec: NewTree, now: u64) -> Result<Tree, StorageError> {
        self.commit(|state| state.prepare_create(spec, now)).await
    }

    async fn get_tree(&self, id: TreeId) -> Result<Tree, StorageError> {
        self.read(|state| state.tree(id).cloned()).await
    }

    async fn list_trees(&self) -> Result<Vec<Tree>, StorageError> {
        Ok(self.read(|state| state.trees()).await)
    }

    async fn update_tree(&self, id: TreeId, mutate: TreeMutator) -> Result<Tree, StorageError> {
        self.commit(|state| state.prepare_update(id, mutate)).await
    }
}

#[async_trait]
impl<J: Journal> RootStorage for StateStore<J> {
    async fn check_connection(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn latest_log_root(&self, id: TreeId) -> Result<Option<SignedLogRoot>, StorageError> {
        Ok(self.read(|state| state.latest_log_root(id)).await)
    }

    async fn log_root_at(&self, id: TreeId, revision: Revision) -> Result<Option<SignedLogRoot>, StorageError> {
        Ok(self.read(|state| state.log_root_at(id, revision)).await)
    }

    async fn store_log_root(&self, expected_previous: Revision, root: SignedLogRoot) -> Result<(), StorageError> {
        self.commit(|state| Ok((state.prepare_log_root(expected_previous, root)?, ())))
            .await
    }

    async fn latest_map_root(&self, id: TreeId) -> Result<Option<SignedMapRoot>, StorageError> {
        Ok(self.read(|state| state.latest_map_root(id)).await)
    }

    async fn map_root_at(&self, id: TreeId, revision: Revision) -> Result<Option<SignedMapRoot>, StorageError> {
        Ok(self.read(|state| state.map_root_at(id, revision)).await)
    }

    async fn store_map_root(&self, expected_previous: Revision, root: SignedMapRoot) -> Result<(), StorageError> {
        self.commit(|state| Ok((state.prepare_map_root(expected_previous, root)?, ())))
            .await
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Storage state shared by every backend.
//!
//! Writes happen in two steps: `prepare_*` validates against the current
//! state and produces the [`StorageRecord`] describing the change, then
//! [`StorageState::apply`] makes it visible through the same
//! [`ReplayState`] fold that startup replay and the offline CLI use.
//! Backends persist the record in between.

use arbor_kernel::{NewTree, Revision, SignedLogRoot, SignedMapRoot, Tree, TreeId, TreeState};
use arbor_persistence::{ReplayState, StorageRecord};

use super::{StorageError, TreeMutator};

#[derive(Debug, Default)]
pub(crate) struct StorageState {
    replayed: ReplayState,
}

impl StorageState {
    pub fn tree(&self, id: TreeId) -> Result<&Tree, StorageError> {
        self.replayed.tree(id).ok_or(StorageError::NotFound(id))
    }

    pub fn trees(&self) -> Vec<Tree> {
        self.replayed.trees().cloned().collect()
    }

    pub fn latest_log_root(&self, id: TreeId) -> Option<SignedLogRoot> {
        self.replayed.log_roots(id).last().cloned()
    }

    pub fn log_root_at(&self, id: TreeId, revision: Revision) -> Option<SignedLogRoot> {
        let index = (revision.0 as usize).checked_sub(1)?;
        self.replayed.log_roots(id).get(index).cloned()
    }

    pub fn latest_map_root(&self, id: TreeId) -> Option<SignedMapRoot> {
        self.replayed.map_roots(id).last().cloned()
    }

    pub fn map_root_at(&self, id: TreeId, revision: Revision) -> Option<SignedMapRoot> {
        let index = (revision.0 as usize).checked_sub(1)?;
        self.replayed.map_roots(id).get(index).cloned()
    }

    pub fn prepare_create(&self, spec: NewTree, now: u64) -> Result<(StorageRecord, Tree), StorageError> {
        let id = TreeId(self.replayed.last_tree_id() + 1);
        let tree = Tree::create(id, spec, now).map_err(StorageError::Rejected)?;
        Ok((StorageRecord::TreeCreated(tree.clone()), tree))
    }

    pub fn prepare_update(&self, id: TreeId, mutate: TreeMutator) -> Result<(StorageRecord, Tree), StorageError> {
        let mut tree = self.tree(id)?.clone();
        mutate(&mut tree).map_err(StorageError::Rejected)?;
        Ok((StorageRecord::TreeUpdated(tree.clone()), tree))
    }

    pub fn prepare_log_root(&self, expected: Revision, root: SignedLogRoot) -> Result<StorageRecord, StorageError> {
        let id = root.tree_id();
        self.check_writable(id)?;
        let current = self.replayed.log_roots(id).len() as u64;
        check_revision(expected, Revision(current), root.revision())?;
        Ok(StorageRecord::LogRootStored(root))
    }

    pub fn prepare_map_root(&self, expected: Revision, root: SignedMapRoot) -> Result<StorageRecord, StorageError> {
        let id = root.map_id();
        self.check_writable(id)?;
        let current = self.replayed.map_roots(id).len() as u64;
        check_revision(expected, Revision(current), root.revision())?;
        Ok(StorageRecord::MapRootStored(root))
    }

    /// Make a prepared (or replayed) record visible.
    pub fn apply(&mut self, record: StorageRecord) {
        self.replayed.apply(record);
    }

    fn check_writable(&self, id: TreeId) -> Result<(), StorageError> {
        let tree = self.tree(id)?;
        if tree.tree_state != TreeState::Active {
            return Err(StorageError::NotWritable {
                id,
                state: tree.tree_state,
            });
        }
        Ok(())
    }
}

fn check_revision(expected: Revision, current: Revision, candidate: Revision) -> Result<(), StorageError> {
    if current != expected || candidate != current.next() {
        return Err(StorageError::Conflict { expected, current });
    }
    Ok(())
}

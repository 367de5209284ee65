//! Replay: fold storage records into the state they describe.
//!
//! The node rebuilds its live state with this at startup and applies every
//! newly committed record through it; offline tools rebuild the same view
//! from a log file. Both go through [`ReplayState::apply`].

use std::collections::{BTreeMap, HashMap};

use arbor_kernel::{SignedLogRoot, SignedMapRoot, Tree, TreeId, TreeState};

use crate::record::StorageRecord;

#[derive(Debug, Default, Clone)]
pub struct ReplayState {
    trees: BTreeMap<TreeId, Tree>,
    /// Index `i` holds revision `i + 1`.
    log_roots: HashMap<TreeId, Vec<SignedLogRoot>>,
    map_roots: HashMap<TreeId, Vec<SignedMapRoot>>,
    /// Highest id ever created. Hard-deleted trees still count.
    last_tree_id: i64,
}

impl ReplayState {
    pub fn from_records(records: impl IntoIterator<Item = StorageRecord>) -> Self {
        let mut state = Self::default();
        for record in records {
            state.apply(record);
        }
        state
    }

    pub fn apply(&mut self, record: StorageRecord) {
        match record {
            StorageRecord::TreeCreated(tree) => {
                self.last_tree_id = self.last_tree_id.max(tree.tree_id.0);
                self.trees.insert(tree.tree_id, tree);
            }
            StorageRecord::TreeUpdated(tree) => {
                if tree.tree_state == TreeState::HardDeleted {
                    self.log_roots.remove(&tree.tree_id);
                    self.map_roots.remove(&tree.tree_id);
                }
                self.trees.insert(tree.tree_id, tree);
            }
            StorageRecord::LogRootStored(root) => {
                self.log_roots.entry(root.tree_id()).or_default().push(root);
            }
            StorageRecord::MapRootStored(root) => {
                self.map_roots.entry(root.map_id()).or_default().push(root);
            }
        }
    }

    pub fn tree(&self, id: TreeId) -> Option<&Tree> {
        self.trees.get(&id)
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.values()
    }

    pub fn log_roots(&self, id: TreeId) -> &[SignedLogRoot] {
        self.log_roots.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn map_roots(&self, id: TreeId) -> &[SignedMapRoot] {
        self.map_roots.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn last_tree_id(&self) -> i64 {
        self.last_tree_id
    }
}

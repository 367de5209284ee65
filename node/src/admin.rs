// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Tree administration.
//!
//! Every operation that changes a tree goes through one storage
//! transaction so the lifecycle checks and the write see the same state.
//! Callers only ever get redacted trees back.

use arbor_kernel::{lifecycle, NewTree, Tree, TreeId, TreeState, TreeUpdate};

use crate::errors::ServiceError;
use crate::registry::Registry;
use crate::storage::TreeMutator;

#[derive(Clone)]
pub struct AdminServer {
    registry: Registry,
}

impl AdminServer {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub async fn create_tree(&self, spec: NewTree) -> Result<Tree, ServiceError> {
        spec.validate()?;

        // The key must resolve to a signer for the configured scheme now,
        // not at the first commit.
        let signer = self
            .registry
            .resolve_signer(&spec.private_key)
            .await
            .map_err(|e| ServiceError::InvalidConfiguration(format!("private_key: {}", e)))?;
        if signer.algorithm() != spec.signature_algorithm {
            return Err(ServiceError::InvalidConfiguration(format!(
                "private_key is {:?} but signature_algorithm is {:?}",
                signer.algorithm(),
                spec.signature_algorithm
            )));
        }

        let now = self.registry.now();
        let tree = self
            .registry
            .storage_call("create_tree", self.registry.admin_storage.create_tree(spec, now))
            .await?;

        metrics::counter!("arbor_trees_created_total", 1, "type" => tree.tree_type.name());
        tracing::info!(
            "Created {} tree {} ({})",
            tree.tree_type.name(),
            tree.tree_id,
            tree.hash_strategy.name()
        );
        Ok(tree.redacted())
    }

    /// ACTIVE and FROZEN trees only; anything deleted is not found.
    pub async fn get_tree(&self, id: TreeId) -> Result<Tree, ServiceError> {
        let tree = self
            .registry
            .storage_call("get_tree", self.registry.admin_storage.get_tree(id))
            .await?;
        tree.ensure_readable()?;
        Ok(tree.redacted())
    }

    /// Serving trees, plus soft-deleted ones when `show_deleted` is set.
    /// Hard-deleted trees are never listed.
    pub async fn list_trees(&self, show_deleted: bool) -> Result<Vec<Tree>, ServiceError> {
        let trees = self
            .registry
            .storage_call("list_trees", self.registry.admin_storage.list_trees())
            .await?;
        Ok(trees
            .iter()
            .filter(|t| t.tree_state.is_serving() || (show_deleted && t.tree_state == TreeState::SoftDeleted))
            .map(Tree::redacted)
            .collect())
    }

    pub async fn update_tree(&self, id: TreeId, update: TreeUpdate) -> Result<Tree, ServiceError> {
        let now = self.registry.now();
        let tree = self
            .mutate("update_tree", id, Box::new(move |t: &mut Tree| t.apply_update(update, now)))
            .await?;
        tracing::info!("Updated tree {} (state {})", tree.tree_id, tree.tree_state.name());
        Ok(tree)
    }

    pub async fn delete_tree(&self, id: TreeId) -> Result<Tree, ServiceError> {
        let now = self.registry.now();
        let tree = self
            .mutate("delete_tree", id, Box::new(move |t: &mut Tree| lifecycle::soft_delete(t, now)))
            .await?;
        tracing::info!("Soft-deleted tree {}", id);
        Ok(tree)
    }

    pub async fn undelete_tree(&self, id: TreeId) -> Result<Tree, ServiceError> {
        let now = self.registry.now();
        let retention = self.registry.retention_nanos();
        let tree = self
            .mutate(
                "undelete_tree",
                id,
                Box::new(move |t: &mut Tree| lifecycle::undelete(t, now, retention)),
            )
            .await?;
        tracing::info!("Undeleted tree {}", id);
        Ok(tree)
    }

    /// Administrator-forced hard delete of a soft-deleted tree, ignoring
    /// the remaining retention.
    pub async fn hard_delete_tree(&self, id: TreeId) -> Result<Tree, ServiceError> {
        let now = self.registry.now();
        let retention = self.registry.retention_nanos();
        let tree = self
            .mutate(
                "hard_delete_tree",
                id,
                Box::new(move |t: &mut Tree| lifecycle::hard_delete(t, now, retention, true)),
            )
            .await?;
        tracing::warn!("Hard-deleted tree {} on request", id);
        Ok(tree)
    }

    /// Hard delete every soft-deleted tree whose retention has run out.
    /// The expiry is re-checked inside each transaction, so a tree undeleted
    /// in the meantime is left alone.
    pub async fn sweep_expired(&self) -> Result<Vec<TreeId>, ServiceError> {
        let now = self.registry.now();
        let retention = self.registry.retention_nanos();
        let trees = self
            .registry
            .storage_call("list_trees", self.registry.admin_storage.list_trees())
            .await?;

        let mut swept = Vec::new();
        for tree in trees.iter().filter(|t| lifecycle::retention_expired(t, now, retention)) {
            let id = tree.tree_id;
            match self
                .mutate(
                    "hard_delete_tree",
                    id,
                    Box::new(move |t: &mut Tree| lifecycle::hard_delete(t, now, retention, false)),
                )
                .await
            {
                Ok(_) => {
                    tracing::info!("Retention expired, hard-deleted tree {}", id);
                    swept.push(id);
                }
                Err(e) => tracing::debug!("Skipped hard delete of tree {}: {}", id, e),
            }
        }
        if !swept.is_empty() {
            metrics::counter!("arbor_trees_hard_deleted_total", swept.len() as u64);
        }
        Ok(swept)
    }

    async fn mutate(&self, what: &'static str, id: TreeId, mutator: TreeMutator) -> Result<Tree, ServiceError> {
        let tree = self
            .registry
            .storage_call(what, self.registry.admin_storage.update_tree(id, mutator))
            .await?;
        metrics::counter!("arbor_tree_updates_total", 1, "state" => tree.tree_state.name());
        Ok(tree.redacted())
    }
}

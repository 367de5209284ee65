// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log root commitment.
//!
//! # Commit protocol
//! ```text
//! read tree (must be ACTIVE log) -> read latest root -> build candidate
//!   -> sign canonical bytes -> conditional store (expected = latest revision)
//! ```
//! The conditional store re-checks both the revision and the tree state, so
//! two concurrent commits cannot both land on the same revision and a
//! freeze that wins the race leaves the candidate unstored.

use std::time::Instant;

use arbor_kernel::{LogRoot, Revision, SignedLogRoot, Tree, TreeId, TreeType};

use crate::errors::ServiceError;
use crate::registry::Registry;

#[derive(Clone)]
pub struct LogServer {
    registry: Registry,
}

impl LogServer {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Storage reachable for both trees and roots.
    pub async fn is_healthy(&self) -> Result<(), ServiceError> {
        self.registry
            .storage_call("check_connection", self.registry.admin_storage.check_connection())
            .await?;
        self.registry
            .storage_call("check_connection", self.registry.root_storage.check_connection())
            .await
    }

    pub async fn commit_root(&self, id: TreeId, root_hash: Vec<u8>, tree_size: u64) -> Result<SignedLogRoot, ServiceError> {
        let start = Instant::now();
        let tree = self.readable_log(id).await?;
        tree.ensure_writable()?;

        let previous = self
            .registry
            .storage_call("latest_log_root", self.registry.root_storage.latest_log_root(id))
            .await?;
        let candidate = LogRoot::next(
            &tree,
            previous.as_ref().map(|p| &p.root),
            root_hash,
            tree_size,
            self.registry.now(),
        )?;

        let signature = self.registry.sign_root(&tree, &candidate.canonical_bytes()).await?;
        let signed = SignedLogRoot {
            root: candidate,
            signature,
        };

        let expected = previous.map_or(Revision::ZERO, |p| p.revision());
        self.registry
            .storage_call(
                "store_log_root",
                self.registry.root_storage.store_log_root(expected, signed.clone()),
            )
            .await?;

        metrics::counter!("arbor_roots_committed_total", 1, "type" => "LOG");
        metrics::histogram!("arbor_root_commit_duration_seconds", start.elapsed().as_secs_f64());
        tracing::info!(
            "Committed log {} revision {} (size {})",
            id,
            signed.revision(),
            signed.root.tree_size
        );
        Ok(signed)
    }

    pub async fn latest_root(&self, id: TreeId) -> Result<SignedLogRoot, ServiceError> {
        self.readable_log(id).await?;
        self.registry
            .storage_call("latest_log_root", self.registry.root_storage.latest_log_root(id))
            .await?
            .ok_or(ServiceError::RootNotFound {
                tree_id: id,
                revision: None,
            })
    }

    pub async fn root_at(&self, id: TreeId, revision: Revision) -> Result<SignedLogRoot, ServiceError> {
        self.readable_log(id).await?;
        self.registry
            .storage_call("log_root_at", self.registry.root_storage.log_root_at(id, revision))
            .await?
            .ok_or(ServiceError::RootNotFound {
                tree_id: id,
                revision: Some(revision),
            })
    }

    async fn readable_log(&self, id: TreeId) -> Result<Tree, ServiceError> {
        let tree = self
            .registry
            .storage_call("get_tree", self.registry.admin_storage.get_tree(id))
            .await?;
        tree.ensure_readable()?;
        tree.ensure_type(TreeType::Log)?;
        Ok(tree)
    }
}

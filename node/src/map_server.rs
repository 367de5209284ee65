// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Map root commitment. Same protocol as [`crate::log_server`], with the
//! source-log high-water marks in place of the tree size.

use std::time::Instant;

use arbor_kernel::{MapRoot, MapRootMetadata, Revision, SignedMapRoot, Tree, TreeId, TreeType};

use crate::errors::ServiceError;
use crate::registry::Registry;

#[derive(Clone)]
pub struct MapServer {
    registry: Registry,
}

impl MapServer {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub async fn commit_root(
        &self,
        id: TreeId,
        root_hash: Vec<u8>,
        metadata: MapRootMetadata,
    ) -> Result<SignedMapRoot, ServiceError> {
        let start = Instant::now();
        let tree = self.readable_map(id).await?;
        tree.ensure_writable()?;

        let previous = self
            .registry
            .storage_call("latest_map_root", self.registry.root_storage.latest_map_root(id))
            .await?;
        let candidate = MapRoot::next(
            &tree,
            previous.as_ref().map(|p| &p.root),
            root_hash,
            metadata,
            self.registry.now(),
        )?;

        let signature = self.registry.sign_root(&tree, &candidate.canonical_bytes()).await?;
        let signed = SignedMapRoot {
            root: candidate,
            signature,
        };

        let expected = previous.map_or(Revision::ZERO, |p| p.revision());
        self.registry
            .storage_call(
                "store_map_root",
                self.registry.root_storage.store_map_root(expected, signed.clone()),
            )
            .await?;

        metrics::counter!("arbor_roots_committed_total", 1, "type" => "MAP");
        metrics::histogram!("arbor_root_commit_duration_seconds", start.elapsed().as_secs_f64());
        tracing::info!(
            "Committed map {} revision {} (log {} fully at {})",
            id,
            signed.revision(),
            signed.root.metadata.source_log_id,
            signed.root.metadata.highest_fully_completed_seq
        );
        Ok(signed)
    }

    pub async fn latest_root(&self, id: TreeId) -> Result<SignedMapRoot, ServiceError> {
        self.readable_map(id).await?;
        self.registry
            .storage_call("latest_map_root", self.registry.root_storage.latest_map_root(id))
            .await?
            .ok_or(ServiceError::RootNotFound {
                tree_id: id,
                revision: None,
            })
    }

    pub async fn root_at(&self, id: TreeId, revision: Revision) -> Result<SignedMapRoot, ServiceError> {
        self.readable_map(id).await?;
        self.registry
            .storage_call("map_root_at", self.registry.root_storage.map_root_at(id, revision))
            .await?
            .ok_or(ServiceError::RootNotFound {
                tree_id: id,
                revision: Some(revision),
            })
    }

    async fn readable_map(&self, id: TreeId) -> Result<Tree, ServiceError> {
        let tree = self
            .registry
            .storage_call("get_tree", self.registry.admin_storage.get_tree(id))
            .await?;
        tree.ensure_readable()?;
        tree.ensure_type(TreeType::Map)?;
        Ok(tree)
    }
}

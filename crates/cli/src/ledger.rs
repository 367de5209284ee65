//! In-memory view of a storage log, rebuilt by replaying its records with
//! the same fold the node uses at startup.

use std::path::Path;

use anyhow::Context;
use arbor_kernel::{Revision, SignedLogRoot, SignedMapRoot, Tree, TreeId};
use arbor_persistence::{read_records, ReplayState, StorageRecord};

#[derive(Debug, Default)]
pub struct Ledger {
    state: ReplayState,
    records: usize,
}

impl Ledger {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let records = read_records(path).with_context(|| format!("failed to read storage log {}", path.display()))?;
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<StorageRecord>) -> Self {
        Ledger {
            records: records.len(),
            state: ReplayState::from_records(records),
        }
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.state.trees()
    }

    pub fn tree(&self, id: TreeId) -> Option<&Tree> {
        self.state.tree(id)
    }

    pub fn log_roots(&self, id: TreeId) -> &[SignedLogRoot] {
        self.state.log_roots(id)
    }

    pub fn map_roots(&self, id: TreeId) -> &[SignedMapRoot] {
        self.state.map_roots(id)
    }

    pub fn latest_revision(&self, id: TreeId) -> Option<Revision> {
        let log = self.log_roots(id).last().map(|r| r.revision());
        log.or_else(|| self.map_roots(id).last().map(|r| r.revision()))
    }

    pub fn record_count(&self) -> usize {
        self.records
    }
}

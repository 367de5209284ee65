//! Storage records: the vocabulary of the durable log.
//!
//! Each accepted storage mutation becomes exactly one record. Replaying the
//! records in order reproduces the storage state; nothing else is persisted.

use arbor_kernel::{SignedLogRoot, SignedMapRoot, Tree};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PersistenceError, Result};
use crate::wal::RecordLogReader;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageRecord {
    TreeCreated(Tree),
    /// Full post-image of the tree after an update or state transition.
    /// A HARD_DELETED post-image also drops every root of the tree; the tree
    /// itself stays as a tombstone so its id is never handed out again.
    TreeUpdated(Tree),
    LogRootStored(SignedLogRoot),
    MapRootStored(SignedMapRoot),
}

impl StorageRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| PersistenceError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (record, read) = bincode::serde::decode_from_slice::<Self, _>(bytes, bincode::config::standard())
            .map_err(|e| PersistenceError::Codec(e.to_string()))?;
        if read != bytes.len() {
            return Err(PersistenceError::Codec(format!(
                "trailing bytes after record: {} of {}",
                read,
                bytes.len()
            )));
        }
        Ok(record)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StorageRecord::TreeCreated(_) => "TreeCreated",
            StorageRecord::TreeUpdated(_) => "TreeUpdated",
            StorageRecord::LogRootStored(_) => "LogRootStored",
            StorageRecord::MapRootStored(_) => "MapRootStored",
        }
    }
}

/// Decode every record of a log, for offline tools.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<StorageRecord>> {
    let mut records = Vec::new();
    for frame in RecordLogReader::open(path)? {
        records.push(StorageRecord::decode(&frame?.payload)?);
    }
    Ok(records)
}

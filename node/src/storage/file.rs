// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable backend: the memory engine journaled to an fsync'd record log.

use std::path::Path;

use arbor_persistence::{PersistenceError, RecordLogWriter, StorageRecord};

use super::memory::{Journal, StateStore};
use super::state::StorageState;
use super::StorageError;

impl From<PersistenceError> for StorageError {
    fn from(e: PersistenceError) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl Journal for RecordLogWriter {
    fn persist(&mut self, record: &StorageRecord) -> Result<(), StorageError> {
        let payload = record.encode()?;
        self.append(&payload)?;
        Ok(())
    }
}

pub type FileStorage = StateStore<RecordLogWriter>;

impl FileStorage {
    /// Open (or create) the log at `path` and replay it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let (writer, frames) = RecordLogWriter::open(path)?;

        let mut state = StorageState::default();
        for frame in &frames {
            state.apply(StorageRecord::decode(&frame.payload)?);
        }
        tracing::info!("Replayed {} storage records from {:?}", frames.len(), path);

        Ok(Self::with_state(state, writer))
    }
}

//! arbor-persistence: durable, checksummed, append-only record log.
//!
//! The log is the only thing that survives a restart; in-memory state is
//! always rebuilt by replaying it front to back.

pub mod error;
pub mod wal;
pub mod record;
pub mod replay;

pub use error::{PersistenceError, Result};
pub use record::{read_records, StorageRecord};
pub use replay::ReplayState;
pub use wal::{Frame, RecordLogReader, RecordLogWriter, MAX_FRAME_LEN};

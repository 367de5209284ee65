use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid magic bytes in header")]
    InvalidMagic,
    #[error("Unsupported log version {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch in frame {seq}: expected {expected}, found {found}")]
    ChecksumMismatch {
        seq: u64,
        expected: u64,
        found: u64,
    },
    #[error("Out-of-order frame: expected sequence {expected}, found {found}")]
    SequenceGap {
        expected: u64,
        found: u64,
    },
    #[error("Corrupt frame header at byte {offset}")]
    CorruptFrameHeader {
        offset: u64,
    },
    #[error("Frame {seq} claims {len} bytes, above the frame size limit")]
    FrameTooLarge {
        seq: u64,
        len: u32,
    },
    #[error("Log writer is unusable after a failed rollback")]
    Poisoned,
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

//! Append-Only Record Log
//!
//! # File Format
//! ```text
//! [Header: 16 bytes][Frame][Frame][Frame]...
//! ```
//!
//! Header:
//! - magic: [u8; 4] ("ARBR")
//! - version: u32 (1)
//! - reserved: u64 (0)
//!
//! Frame:
//! - seq: u64 (starts at 1, strictly +1)
//! - payload_len: u32 (at most [`MAX_FRAME_LEN`])
//! - header_checksum: u64 (CRC-64 over seq, payload_len)
//! - checksum: u64 (CRC-64 over seq, payload_len, payload)
//! - payload
//!
//! The frame header carries its own checksum, so a damaged length is caught
//! before it is used to size a read. A frame that runs past the end of the
//! file with an intact header is a torn tail (crash mid-append) and is
//! dropped on open; any other damage fails the open.

use crate::error::{PersistenceError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc64fast::Digest;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const MAGIC: [u8; 4] = *b"ARBR";
pub const VERSION: u32 = 1;

/// Largest payload a single frame may carry (16 MiB).
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    pub version: u32,
    pub reserved: u64,
}

impl LogHeader {
    pub const SIZE: usize = 4 + 4 + 8;

    pub fn new() -> Self {
        Self { version: VERSION, reserved: 0 }
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u64::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(PersistenceError::InvalidMagic);
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(PersistenceError::UnsupportedVersion(version));
        }
        let reserved = reader.read_u64::<LittleEndian>()?;
        Ok(Self { version, reserved })
    }
}

impl Default for LogHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub seq: u64,
    pub payload_len: u32,
    pub header_checksum: u64,
    pub checksum: u64,
}

impl FrameHeader {
    pub const SIZE: usize = 8 + 4 + 8 + 8; // 28 bytes

    fn for_payload(seq: u64, payload: &[u8]) -> Self {
        let payload_len = payload.len() as u32;
        Self {
            seq,
            payload_len,
            header_checksum: header_checksum(seq, payload_len),
            checksum: checksum(seq, payload_len, payload),
        }
    }

    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let seq = reader.read_u64::<LittleEndian>()?;
        let payload_len = reader.read_u32::<LittleEndian>()?;
        let header_checksum = reader.read_u64::<LittleEndian>()?;
        let checksum = reader.read_u64::<LittleEndian>()?;
        Ok(Self {
            seq,
            payload_len,
            header_checksum,
            checksum,
        })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u64::<LittleEndian>(self.seq)?;
        writer.write_u32::<LittleEndian>(self.payload_len)?;
        writer.write_u64::<LittleEndian>(self.header_checksum)?;
        writer.write_u64::<LittleEndian>(self.checksum)
    }

    fn is_intact(&self) -> bool {
        header_checksum(self.seq, self.payload_len) == self.header_checksum
    }
}

fn header_checksum(seq: u64, payload_len: u32) -> u64 {
    let mut digest = Digest::new();
    digest.write(&seq.to_le_bytes());
    digest.write(&payload_len.to_le_bytes());
    digest.sum64()
}

fn checksum(seq: u64, payload_len: u32, payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&seq.to_le_bytes());
    digest.write(&payload_len.to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: u64,
    pub payload: Vec<u8>,
}

/// Iterates verified frames. Stops cleanly at a torn tail.
pub struct RecordLogReader {
    reader: BufReader<File>,
    expected_seq: u64,
    /// Byte offset just past the last good frame.
    valid_len: u64,
}

impl RecordLogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        LogHeader::read_from(&mut reader)?;
        Ok(Self {
            reader,
            expected_seq: 1,
            valid_len: LogHeader::SIZE as u64,
        })
    }

    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    pub fn next_seq(&self) -> u64 {
        self.expected_seq
    }
}

impl Iterator for RecordLogReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let header = match FrameHeader::read_from(&mut self.reader) {
            Ok(h) => h,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(e.into())),
        };

        if !header.is_intact() {
            return Some(Err(PersistenceError::CorruptFrameHeader { offset: self.valid_len }));
        }
        if header.payload_len > MAX_FRAME_LEN {
            return Some(Err(PersistenceError::FrameTooLarge {
                seq: header.seq,
                len: header.payload_len,
            }));
        }

        // The length is trusted from here on: running out of bytes means the
        // frame was cut short by a crash.
        let mut payload = vec![0u8; header.payload_len as usize];
        match self.reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(e.into())),
        }

        let found = checksum(header.seq, header.payload_len, &payload);
        if found != header.checksum {
            return Some(Err(PersistenceError::ChecksumMismatch {
                seq: header.seq,
                expected: header.checksum,
                found,
            }));
        }
        if header.seq != self.expected_seq {
            return Some(Err(PersistenceError::SequenceGap {
                expected: self.expected_seq,
                found: header.seq,
            }));
        }

        self.expected_seq += 1;
        self.valid_len += (FrameHeader::SIZE + payload.len()) as u64;
        Some(Ok(Frame { seq: header.seq, payload }))
    }
}

/// Append-only writer.
///
/// # Safety Guarantees
/// - `append` returns only after the frame is fsync'd
/// - a torn tail left by a crash is truncated on open, never appended after
/// - a failed `append` cuts the file back to its last good frame; if even
///   that fails the writer refuses every later append
pub struct RecordLogWriter {
    path: PathBuf,
    file: File,
    next_seq: u64,
    /// Length of the file up to and including the last good frame.
    len: u64,
    poisoned: bool,
}

impl RecordLogWriter {
    /// Open or create a log. Returns the writer together with every frame
    /// already on disk so callers can replay before accepting writes.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<Frame>)> {
        let path = path.as_ref().to_path_buf();
        let file_exists = path.exists() && std::fs::metadata(&path)?.len() > 0;

        let mut frames = Vec::new();
        let mut next_seq = 1;
        let mut len = LogHeader::SIZE as u64;

        let mut file = OpenOptions::new().create(true).read(true).write(true).open(&path)?;

        if file_exists {
            let mut reader = RecordLogReader::open(&path)?;
            for frame in reader.by_ref() {
                frames.push(frame?);
            }
            next_seq = reader.next_seq();

            len = reader.valid_len();
            if file.metadata()?.len() > len {
                // Torn tail from an interrupted append.
                file.set_len(len)?;
                file.sync_all()?;
            }
            file.seek(SeekFrom::Start(len))?;
        } else {
            LogHeader::new().write_to(&mut file)?;
            file.sync_all()?;
        }

        Ok((
            Self {
                path,
                file,
                next_seq,
                len,
                poisoned: false,
            },
            frames,
        ))
    }

    /// Append one frame and fsync. Returns its sequence number.
    ///
    /// On error nothing of the frame remains in the log and the sequence
    /// number is not consumed.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        if self.poisoned {
            return Err(PersistenceError::Poisoned);
        }
        if payload.len() > MAX_FRAME_LEN as usize {
            return Err(PersistenceError::FrameTooLarge {
                seq: self.next_seq,
                len: u32::try_from(payload.len()).unwrap_or(u32::MAX),
            });
        }

        let seq = self.next_seq;
        let mut frame = Vec::with_capacity(FrameHeader::SIZE + payload.len());
        FrameHeader::for_payload(seq, payload).write_to(&mut frame)?;
        frame.extend_from_slice(payload);

        let written = self
            .file
            .write_all(&frame)
            .and_then(|()| self.file.sync_data());
        if let Err(e) = written {
            if self.rollback().is_err() {
                self.poisoned = true;
            }
            return Err(e.into());
        }

        self.next_seq += 1;
        self.len += frame.len() as u64;
        Ok(seq)
    }

    /// Cut the file back to the last good frame.
    fn rollback(&mut self) -> io::Result<()> {
        self.file.set_len(self.len)?;
        self.file.seek(SeekFrom::Start(self.len))?;
        self.file.sync_all()
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

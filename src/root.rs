// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Signed Root Commitments
//!
//! A root binds one revision of a tree to a root hash at a point in time.
//! The signer only ever sees [`LogRoot::canonical_bytes`] /
//! [`MapRoot::canonical_bytes`]; verifiers recompute the same bytes.
//!
//! # Canonical encoding (big-endian)
//! ```text
//! [version: u16 = 1][kind: u8][tree_id: i64][revision: u64][timestamp_nanos: u64]
//! [root_hash_len: u8][root_hash]
//! log: [tree_size: u64]
//! map: [source_log_id: i64][highest_fully_completed_seq: u64][highest_partially_completed_seq: u64]
//! ```
//!
//! # Invariants
//! - Revisions of one tree are 1, 2, 3, ... with no gaps and no reuse
//! - Log `tree_size` never decreases
//! - Map high-water marks never decrease and the source log never changes

use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::tree::Tree;
use crate::types::{HashAlgorithm, Revision, SignatureAlgorithm, TreeId, TreeType};

pub const ROOT_FORMAT_VERSION: u16 = 1;

const KIND_LOG: u8 = 1;
const KIND_MAP: u8 = 2;

/// Signature envelope; records the scheme so verifiers need no tree lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitallySigned {
    pub hash_algorithm: HashAlgorithm,
    pub signature_algorithm: SignatureAlgorithm,
    pub signature: Vec<u8>,
}

/// Unsigned log root candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRoot {
    pub tree_id: TreeId,
    pub revision: Revision,
    pub timestamp_nanos: u64,
    pub root_hash: Vec<u8>,
    pub tree_size: u64,
}

impl LogRoot {
    /// Build the candidate that follows `previous` (or revision 1).
    pub fn next(
        tree: &Tree,
        previous: Option<&LogRoot>,
        root_hash: Vec<u8>,
        tree_size: u64,
        now: u64,
    ) -> Result<Self> {
        tree.ensure_type(TreeType::Log)?;
        check_root_hash(tree, &root_hash)?;

        let (revision, timestamp_nanos) = match previous {
            Some(prev) => {
                if tree_size < prev.tree_size {
                    return Err(KernelError::NonMonotonicCommitment);
                }
                (prev.revision.next(), core::cmp::max(now, prev.timestamp_nanos))
            }
            None => (Revision::ZERO.next(), now),
        };

        Ok(Self {
            tree_id: tree.tree_id,
            revision,
            timestamp_nanos,
            root_hash,
            tree_size,
        })
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = encode_prefix(KIND_LOG, self.tree_id, self.revision, self.timestamp_nanos, &self.root_hash);
        buf.extend_from_slice(&self.tree_size.to_be_bytes());
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLogRoot {
    pub root: LogRoot,
    pub signature: DigitallySigned,
}

impl SignedLogRoot {
    pub fn tree_id(&self) -> TreeId {
        self.root.tree_id
    }

    pub fn revision(&self) -> Revision {
        self.root.revision
    }

    /// BLAKE3 over the signed bytes; a short handle for logs and tooling.
    pub fn fingerprint(&self) -> [u8; 32] {
        *blake3::hash(&self.root.canonical_bytes()).as_bytes()
    }
}

/// Progress of a map over its source log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRootMetadata {
    pub source_log_id: TreeId,
    pub highest_fully_completed_seq: u64,
    pub highest_partially_completed_seq: u64,
}

impl MapRootMetadata {
    fn check_follows(&self, prev: &MapRootMetadata) -> Result<()> {
        if self.source_log_id != prev.source_log_id
            || self.highest_fully_completed_seq < prev.highest_fully_completed_seq
            || self.highest_partially_completed_seq < prev.highest_partially_completed_seq
        {
            return Err(KernelError::NonMonotonicCommitment);
        }
        Ok(())
    }
}

/// Unsigned map root candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRoot {
    pub map_id: TreeId,
    pub revision: Revision,
    pub timestamp_nanos: u64,
    pub root_hash: Vec<u8>,
    pub metadata: MapRootMetadata,
}

impl MapRoot {
    pub fn next(
        tree: &Tree,
        previous: Option<&MapRoot>,
        root_hash: Vec<u8>,
        metadata: MapRootMetadata,
        now: u64,
    ) -> Result<Self> {
        tree.ensure_type(TreeType::Map)?;
        check_root_hash(tree, &root_hash)?;

        let (revision, timestamp_nanos) = match previous {
            Some(prev) => {
                metadata.check_follows(&prev.metadata)?;
                (prev.revision.next(), core::cmp::max(now, prev.timestamp_nanos))
            }
            None => (Revision::ZERO.next(), now),
        };

        Ok(Self {
            map_id: tree.tree_id,
            revision,
            timestamp_nanos,
            root_hash,
            metadata,
        })
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = encode_prefix(KIND_MAP, self.map_id, self.revision, self.timestamp_nanos, &self.root_hash);
        buf.extend_from_slice(&self.metadata.source_log_id.0.to_be_bytes());
        buf.extend_from_slice(&self.metadata.highest_fully_completed_seq.to_be_bytes());
        buf.extend_from_slice(&self.metadata.highest_partially_completed_seq.to_be_bytes());
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMapRoot {
    pub root: MapRoot,
    pub signature: DigitallySigned,
}

impl SignedMapRoot {
    pub fn map_id(&self) -> TreeId {
        self.root.map_id
    }

    pub fn revision(&self) -> Revision {
        self.root.revision
    }

    pub fn fingerprint(&self) -> [u8; 32] {
        *blake3::hash(&self.root.canonical_bytes()).as_bytes()
    }
}

fn check_root_hash(tree: &Tree, root_hash: &[u8]) -> Result<()> {
    let expected = tree.hash_strategy.digest_len();
    if root_hash.len() != expected {
        return Err(KernelError::InvalidRootHash {
            expected,
            actual: root_hash.len(),
        });
    }
    Ok(())
}

fn encode_prefix(kind: u8, tree_id: TreeId, revision: Revision, timestamp_nanos: u64, root_hash: &[u8]) -> Vec<u8> {
    // Hash length fits in u8: digest lengths are bounded by check_root_hash.
    let mut buf = Vec::with_capacity(2 + 1 + 8 + 8 + 8 + 1 + root_hash.len() + 24);
    buf.extend_from_slice(&ROOT_FORMAT_VERSION.to_be_bytes());
    buf.push(kind);
    buf.extend_from_slice(&tree_id.0.to_be_bytes());
    buf.extend_from_slice(&revision.0.to_be_bytes());
    buf.extend_from_slice(&timestamp_nanos.to_be_bytes());
    buf.push(root_hash.len() as u8);
    buf.extend_from_slice(root_hash);
    buf
}

// ============================================================================
// Chain audit (offline verification)
// ============================================================================

/// First problem found while auditing a sequence of committed roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainViolation {
    /// Root at `index` belongs to another tree.
    ForeignRoot { index: usize },
    /// Revisions must be 1, 2, 3, ... in order.
    RevisionGap { index: usize, expected: Revision, found: Revision },
    /// Size or high-water marks went backwards at `index`.
    Regression { index: usize },
}

impl fmt::Display for ChainViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainViolation::ForeignRoot { index } => write!(f, "root #{} belongs to another tree", index),
            ChainViolation::RevisionGap { index, expected, found } => {
                write!(f, "root #{} has revision {}, expected {}", index, found, expected)
            }
            ChainViolation::Regression { index } => write!(f, "root #{} regresses its predecessor", index),
        }
    }
}

pub fn audit_log_chain(tree_id: TreeId, roots: &[LogRoot]) -> core::result::Result<(), ChainViolation> {
    let mut expected = Revision::ZERO.next();
    for (index, root) in roots.iter().enumerate() {
        if root.tree_id != tree_id {
            return Err(ChainViolation::ForeignRoot { index });
        }
        if root.revision != expected {
            return Err(ChainViolation::RevisionGap { index, expected, found: root.revision });
        }
        if index > 0 && root.tree_size < roots[index - 1].tree_size {
            return Err(ChainViolation::Regression { index });
        }
        expected = expected.next();
    }
    Ok(())
}

pub fn audit_map_chain(map_id: TreeId, roots: &[MapRoot]) -> core::result::Result<(), ChainViolation> {
    let mut expected = Revision::ZERO.next();
    for (index, root) in roots.iter().enumerate() {
        if root.map_id != map_id {
            return Err(ChainViolation::ForeignRoot { index });
        }
        if root.revision != expected {
            return Err(ChainViolation::RevisionGap { index, expected, found: root.revision });
        }
        if index > 0 && root.metadata.check_follows(&roots[index - 1].metadata).is_err() {
            return Err(ChainViolation::Regression { index });
        }
        expected = expected.next();
    }
    Ok(())
}

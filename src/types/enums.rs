// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Tree configuration enums.
//!
//! Every enum reserves discriminant 0 for an "unknown" sentinel so that a
//! record written by a newer schema (or a zeroed field) is detected instead
//! of being silently interpreted. Sentinels are never valid configuration.
//! Names this build does not know decode to the sentinel as well, so they
//! fail validation instead of failing to parse.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TreeType {
    Log = 1,
    Map = 2,
    #[serde(other)]
    Unknown = 0,
}

impl TreeType {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(TreeType::Unknown),
            1 => Some(TreeType::Log),
            2 => Some(TreeType::Map),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TreeType::Unknown => "UNKNOWN",
            TreeType::Log => "LOG",
            TreeType::Map => "MAP",
        }
    }
}

impl Default for TreeType {
    fn default() -> Self {
        TreeType::Unknown
    }
}

/// Hashing convention for leaves, interior nodes and empty subtrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum HashStrategy {
    Rfc6962Sha256 = 1,
    TestMapHasher = 2,
    ObjectRfc6962Sha256 = 3,
    ConiksSha512_256 = 4,
    #[serde(other)]
    Unknown = 0,
}

impl HashStrategy {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(HashStrategy::Unknown),
            1 => Some(HashStrategy::Rfc6962Sha256),
            2 => Some(HashStrategy::TestMapHasher),
            3 => Some(HashStrategy::ObjectRfc6962Sha256),
            4 => Some(HashStrategy::ConiksSha512_256),
            _ => None,
        }
    }

    /// Tree type this strategy builds, `None` for the sentinel.
    pub fn tree_type(&self) -> Option<TreeType> {
        match self {
            HashStrategy::Rfc6962Sha256 | HashStrategy::ObjectRfc6962Sha256 => Some(TreeType::Log),
            HashStrategy::TestMapHasher | HashStrategy::ConiksSha512_256 => Some(TreeType::Map),
            HashStrategy::Unknown => None,
        }
    }

    /// Size in bytes of a root hash produced by this strategy.
    pub fn digest_len(&self) -> usize {
        match self {
            HashStrategy::Unknown => 0,
            // SHA-512/256 truncates to 32 bytes as well.
            _ => 32,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashStrategy::Unknown => "UNKNOWN",
            HashStrategy::Rfc6962Sha256 => "RFC6962_SHA256",
            HashStrategy::TestMapHasher => "TEST_MAP_HASHER",
            HashStrategy::ObjectRfc6962Sha256 => "OBJECT_RFC6962_SHA256",
            HashStrategy::ConiksSha512_256 => "CONIKS_SHA512_256",
        }
    }
}

impl Default for HashStrategy {
    fn default() -> Self {
        HashStrategy::Unknown
    }
}

/// Digest used by the signature scheme (TLS HashAlgorithm numbering).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum HashAlgorithm {
    Sha256 = 4,
    Sha512 = 6,
    #[serde(other)]
    None = 0,
}

impl HashAlgorithm {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(HashAlgorithm::None),
            4 => Some(HashAlgorithm::Sha256),
            6 => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::None
    }
}

/// Signature scheme (TLS SignatureAlgorithm numbering).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum SignatureAlgorithm {
    Rsa = 1,
    Ecdsa = 3,
    Ed25519 = 7,
    #[serde(other)]
    Anonymous = 0,
}

impl SignatureAlgorithm {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(SignatureAlgorithm::Anonymous),
            1 => Some(SignatureAlgorithm::Rsa),
            3 => Some(SignatureAlgorithm::Ecdsa),
            7 => Some(SignatureAlgorithm::Ed25519),
            _ => None,
        }
    }

    /// Whether signatures of this scheme may be computed over `hash`.
    pub fn supports(&self, hash: HashAlgorithm) -> bool {
        match (self, hash) {
            (SignatureAlgorithm::Anonymous, _) | (_, HashAlgorithm::None) => false,
            // Ed25519 hashes with SHA-512 internally.
            (SignatureAlgorithm::Ed25519, h) => h == HashAlgorithm::Sha512,
            (SignatureAlgorithm::Rsa, _) | (SignatureAlgorithm::Ecdsa, _) => true,
        }
    }
}

impl Default for SignatureAlgorithm {
    fn default() -> Self {
        SignatureAlgorithm::Anonymous
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum DuplicatePolicy {
    NotAllowed = 1,
    Allowed = 2,
    #[serde(other)]
    Unknown = 0,
}

impl DuplicatePolicy {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(DuplicatePolicy::Unknown),
            1 => Some(DuplicatePolicy::NotAllowed),
            2 => Some(DuplicatePolicy::Allowed),
            _ => None,
        }
    }
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::Unknown
    }
}

/// Lifecycle state. Legal moves live in [`crate::lifecycle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TreeState {
    Active = 1,
    Frozen = 2,
    SoftDeleted = 3,
    HardDeleted = 4,
    #[serde(other)]
    Unknown = 0,
}

impl TreeState {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(TreeState::Unknown),
            1 => Some(TreeState::Active),
            2 => Some(TreeState::Frozen),
            3 => Some(TreeState::SoftDeleted),
            4 => Some(TreeState::HardDeleted),
            _ => None,
        }
    }

    /// Visible to readers (and therefore to anyone addressing the tree).
    pub fn is_serving(&self) -> bool {
        matches!(self, TreeState::Active | TreeState::Frozen)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, TreeState::SoftDeleted | TreeState::HardDeleted)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TreeState::Unknown => "UNKNOWN",
            TreeState::Active => "ACTIVE",
            TreeState::Frozen => "FROZEN",
            TreeState::SoftDeleted => "SOFT_DELETED",
            TreeState::HardDeleted => "HARD_DELETED",
        }
    }
}

impl Default for TreeState {
    fn default() -> Self {
        TreeState::Unknown
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! JSON wire types. Byte fields travel as lowercase hex.

use std::fmt;

use arbor_kernel::types::*;
use arbor_kernel::{
    DigitallySigned, MapRootMetadata, NewTree, PrivateKeyRef, SignedLogRoot, SignedMapRoot, Tree, TreeUpdate,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Trees as callers see them: never with key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeView {
    pub tree_id: TreeId,
    pub tree_type: TreeType,
    pub tree_state: TreeState,
    pub hash_strategy: HashStrategy,
    pub hash_algorithm: HashAlgorithm,
    pub signature_algorithm: SignatureAlgorithm,
    pub duplicate_policy: DuplicatePolicy,
    pub display_name: String,
    pub description: String,
    pub create_time_nanos: u64,
    pub update_time_nanos: u64,
    pub delete_time_nanos: Option<u64>,
}

impl From<&Tree> for TreeView {
    fn from(t: &Tree) -> Self {
        Self {
            tree_id: t.tree_id,
            tree_type: t.tree_type,
            tree_state: t.tree_state,
            hash_strategy: t.hash_strategy,
            hash_algorithm: t.hash_algorithm,
            signature_algorithm: t.signature_algorithm,
            duplicate_policy: t.duplicate_policy,
            display_name: t.display_name.clone(),
            description: t.description.clone(),
            create_time_nanos: t.create_time,
            update_time_nanos: t.update_time,
            delete_time_nanos: t.delete_time,
        }
    }
}

/// Key reference on the wire, discriminated by `kind`:
/// `{"kind": "PEM_FILE", "path": ..., "password": ...}` or
/// `{"kind": "PRIVATE_KEY", "der": "<hex>"}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyRefBody {
    PemFile {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    PrivateKey {
        der: String,
    },
}

impl KeyRefBody {
    pub fn into_key_ref(self) -> Result<PrivateKeyRef, ServiceError> {
        match self {
            KeyRefBody::PemFile { path, password } => Ok(PrivateKeyRef::PemFile { path, password }),
            KeyRefBody::PrivateKey { der } => {
                let der = hex::decode(&der).map_err(|e| {
                    ServiceError::InvalidConfiguration(format!("private_key.der is not valid hex: {}", e))
                })?;
                Ok(PrivateKeyRef::PrivateKey { der })
            }
        }
    }
}

impl From<&PrivateKeyRef> for KeyRefBody {
    fn from(key: &PrivateKeyRef) -> Self {
        match key {
            PrivateKeyRef::PemFile { path, password } => KeyRefBody::PemFile {
                path: path.clone(),
                password: password.clone(),
            },
            PrivateKeyRef::PrivateKey { der } => KeyRefBody::PrivateKey { der: hex::encode(der) },
        }
    }
}

impl fmt::Debug for KeyRefBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRefBody::PemFile { path, password } => f
                .debug_struct("PemFile")
                .field("path", path)
                .field("password", &password.as_ref().map(|_| "<redacted>"))
                .finish(),
            KeyRefBody::PrivateKey { .. } => f.debug_struct("PrivateKey").field("der", &"<redacted>").finish(),
        }
    }
}

/// `POST /v1/trees`. Omitted enum fields decode to their unknown sentinel
/// and are then rejected as invalid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTreeRequest {
    #[serde(default)]
    pub tree_type: TreeType,
    #[serde(default)]
    pub hash_strategy: HashStrategy,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub private_key: KeyRefBody,
}

impl CreateTreeRequest {
    pub fn into_new_tree(self) -> Result<NewTree, ServiceError> {
        Ok(NewTree {
            tree_type: self.tree_type,
            hash_strategy: self.hash_strategy,
            hash_algorithm: self.hash_algorithm,
            signature_algorithm: self.signature_algorithm,
            duplicate_policy: self.duplicate_policy,
            display_name: self.display_name,
            description: self.description,
            private_key: self.private_key.into_key_ref()?,
        })
    }
}

impl From<&NewTree> for CreateTreeRequest {
    fn from(t: &NewTree) -> Self {
        Self {
            tree_type: t.tree_type,
            hash_strategy: t.hash_strategy,
            hash_algorithm: t.hash_algorithm,
            signature_algorithm: t.signature_algorithm,
            duplicate_policy: t.duplicate_policy,
            display_name: t.display_name.clone(),
            description: t.description.clone(),
            private_key: KeyRefBody::from(&t.private_key),
        }
    }
}

/// `PATCH /v1/trees/:id`. Immutable fields are accepted only to be refused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateTreeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_state: Option<TreeState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<KeyRefBody>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<TreeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_type: Option<TreeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_strategy: Option<HashStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<HashAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<SignatureAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_policy: Option<DuplicatePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<u64>,
}

impl UpdateTreeRequest {
    pub fn into_update(self) -> Result<TreeUpdate, ServiceError> {
        Ok(TreeUpdate {
            display_name: self.display_name,
            description: self.description,
            tree_state: self.tree_state,
            private_key: self.private_key.map(KeyRefBody::into_key_ref).transpose()?,
            tree_id: self.tree_id,
            tree_type: self.tree_type,
            hash_strategy: self.hash_strategy,
            hash_algorithm: self.hash_algorithm,
            signature_algorithm: self.signature_algorithm,
            duplicate_policy: self.duplicate_policy,
            create_time: self.create_time,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTreesQuery {
    #[serde(default)]
    pub show_deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListTreesResponse {
    pub trees: Vec<TreeView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitLogRootRequest {
    pub root_hash: String,
    pub tree_size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitMapRootRequest {
    pub root_hash: String,
    pub metadata: MapRootMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureView {
    pub hash_algorithm: HashAlgorithm,
    pub signature_algorithm: SignatureAlgorithm,
    pub signature: String,
}

impl From<&DigitallySigned> for SignatureView {
    fn from(s: &DigitallySigned) -> Self {
        Self {
            hash_algorithm: s.hash_algorithm,
            signature_algorithm: s.signature_algorithm,
            signature: hex::encode(&s.signature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLogRootView {
    pub tree_id: TreeId,
    pub tree_revision: Revision,
    pub timestamp_nanos: u64,
    pub root_hash: String,
    pub tree_size: u64,
    pub signature: SignatureView,
}

impl From<&SignedLogRoot> for SignedLogRootView {
    fn from(r: &SignedLogRoot) -> Self {
        Self {
            tree_id: r.root.tree_id,
            tree_revision: r.root.revision,
            timestamp_nanos: r.root.timestamp_nanos,
            root_hash: hex::encode(&r.root.root_hash),
            tree_size: r.root.tree_size,
            signature: SignatureView::from(&r.signature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMapRootView {
    pub map_id: TreeId,
    pub map_revision: Revision,
    pub timestamp_nanos: u64,
    pub root_hash: String,
    pub metadata: MapRootMetadata,
    pub signature: SignatureView,
}

impl From<&SignedMapRoot> for SignedMapRootView {
    fn from(r: &SignedMapRoot) -> Self {
        Self {
            map_id: r.root.map_id,
            map_revision: r.root.revision,
            timestamp_nanos: r.root.timestamp_nanos,
            root_hash: hex::encode(&r.root.root_hash),
            metadata: r.root.metadata,
            signature: SignatureView::from(&r.signature),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, ServiceError> {
    hex::decode(value).map_err(|e| ServiceError::InvalidArgument(format!("{} is not valid hex: {}", field, e)))
}

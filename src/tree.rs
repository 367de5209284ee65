// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Tree Entity
//!
//! The durable record of one verifiable log or map.
//!
//! # Invariants
//! - `tree_id`, `tree_type`, the hash/signature choices, `duplicate_policy`
//!   and `create_time` never change after creation
//! - `tree_state` only moves along the lifecycle graph
//! - `update_time` strictly increases on every successful mutation
//! - `private_key` is write-only: outward views go through [`Tree::redacted`]

use alloc::string::String;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::keys::PrivateKeyRef;
use crate::lifecycle;
use crate::types::{DuplicatePolicy, HashAlgorithm, HashStrategy, SignatureAlgorithm, TreeId, TreeState, TreeType};

pub const MAX_DISPLAY_NAME_LEN: usize = 20;
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Creation request for a tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTree {
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
    pub private_key: PrivateKeyRef,
}

impl NewTree {
    /// Configuration check run once at creation; the result is frozen into the tree.
    pub fn validate(&self) -> Result<()> {
        validate_config(
            self.tree_type,
            self.hash_strategy,
            self.hash_algorithm,
            self.signature_algorithm,
            self.duplicate_policy,
        )?;
        validate_labels(&self.display_name, &self.description)
    }
}

pub fn validate_config(
    tree_type: TreeType,
    hash_strategy: HashStrategy,
    hash_algorithm: HashAlgorithm,
    signature_algorithm: SignatureAlgorithm,
    duplicate_policy: DuplicatePolicy,
) -> Result<()> {
    if tree_type == TreeType::Unknown {
        return Err(KernelError::InvalidConfiguration("tree_type is unspecified"));
    }
    if hash_strategy == HashStrategy::Unknown {
        return Err(KernelError::InvalidConfiguration("hash_strategy is unspecified"));
    }
    if hash_algorithm == HashAlgorithm::None {
        return Err(KernelError::InvalidConfiguration("hash_algorithm is unspecified"));
    }
    if signature_algorithm == SignatureAlgorithm::Anonymous {
        return Err(KernelError::InvalidConfiguration("signature_algorithm is unspecified"));
    }
    if duplicate_policy == DuplicatePolicy::Unknown {
        return Err(KernelError::InvalidConfiguration("duplicate_policy is unspecified"));
    }
    if hash_strategy.tree_type() != Some(tree_type) {
        return Err(KernelError::InvalidConfiguration("hash_strategy does not apply to tree_type"));
    }
    if !signature_algorithm.supports(hash_algorithm) {
        return Err(KernelError::InvalidConfiguration(
            "signature_algorithm is not supported with hash_algorithm",
        ));
    }
    Ok(())
}

fn validate_labels(display_name: &str, description: &str) -> Result<()> {
    if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(KernelError::InvalidArgument("display_name is too long"));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(KernelError::InvalidArgument("description is too long"));
    }
    Ok(())
}

/// A log or map. Timestamps are nanoseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub tree_id: TreeId,
    pub tree_type: TreeType,
    pub tree_state: TreeState,
    pub hash_strategy: HashStrategy,
    pub hash_algorithm: HashAlgorithm,
    pub signature_algorithm: SignatureAlgorithm,
    pub duplicate_policy: DuplicatePolicy,
    pub display_name: String,
    pub description: String,
    pub create_time: u64,
    pub update_time: u64,
    /// Set when the tree enters SOFT_DELETED; starts the retention timer.
    pub delete_time: Option<u64>,
    /// `None` only on redacted views.
    pub private_key: Option<PrivateKeyRef>,
}

impl Tree {
    pub fn create(tree_id: TreeId, spec: NewTree, now: u64) -> Result<Self> {
        if !tree_id.is_valid() {
            return Err(KernelError::InvalidArgument("tree_id must be positive"));
        }
        spec.validate()?;

        Ok(Self {
            tree_id,
            tree_type: spec.tree_type,
            tree_state: TreeState::Active,
            hash_strategy: spec.hash_strategy,
            hash_algorithm: spec.hash_algorithm,
            signature_algorithm: spec.signature_algorithm,
            duplicate_policy: spec.duplicate_policy,
            display_name: spec.display_name,
            description: spec.description,
            create_time: now,
            update_time: now,
            delete_time: None,
            private_key: Some(spec.private_key),
        })
    }

    /// Copy safe to hand to callers.
    pub fn redacted(&self) -> Self {
        Self {
            private_key: None,
            ..self.clone()
        }
    }

    /// Readers may see ACTIVE and FROZEN trees only.
    pub fn ensure_readable(&self) -> Result<()> {
        if self.tree_state.is_serving() {
            Ok(())
        } else {
            Err(KernelError::TreeNotFound)
        }
    }

    /// Writers additionally need the tree to be ACTIVE.
    pub fn ensure_writable(&self) -> Result<()> {
        self.ensure_readable()?;
        if self.tree_state == TreeState::Active {
            Ok(())
        } else {
            Err(KernelError::TreeFrozen)
        }
    }

    pub fn ensure_type(&self, expected: TreeType) -> Result<()> {
        if self.tree_type == expected {
            Ok(())
        } else {
            match expected {
                TreeType::Map => Err(KernelError::InvalidArgument("tree is not a map")),
                _ => Err(KernelError::InvalidArgument("tree is not a log")),
            }
        }
    }

    /// Stamp a mutation. Keeps `update_time` strictly increasing even when
    /// the clock does not advance between two updates.
    pub fn touch(&mut self, now: u64) {
        self.update_time = core::cmp::max(now, self.update_time + 1);
    }

    /// Apply an administrative update. All checks run before anything is
    /// written, so a rejected update leaves the tree untouched.
    pub fn apply_update(&mut self, update: TreeUpdate, now: u64) -> Result<()> {
        self.ensure_readable()?;
        update.reject_immutable()?;
        if update.is_empty() {
            return Err(KernelError::InvalidArgument("update sets no fields"));
        }

        let display_name = update.display_name.as_deref().unwrap_or(&self.display_name);
        let description = update.description.as_deref().unwrap_or(&self.description);
        validate_labels(display_name, description)?;

        if let Some(target) = update.tree_state {
            lifecycle::check_serving_transition(self.tree_state, target)?;
        }

        if let Some(name) = update.display_name {
            self.display_name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(target) = update.tree_state {
            self.tree_state = target;
        }
        if let Some(key) = update.private_key {
            self.private_key = Some(key);
        }
        self.touch(now);
        Ok(())
    }
}

/// Field-mask style update. Immutable fields are present only so that an
/// attempt to change them can be rejected explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub tree_state: Option<TreeState>,
    pub private_key: Option<PrivateKeyRef>,

    pub tree_id: Option<TreeId>,
    pub tree_type: Option<TreeType>,
    pub hash_strategy: Option<HashStrategy>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub signature_algorithm: Option<SignatureAlgorithm>,
    pub duplicate_policy: Option<DuplicatePolicy>,
    pub create_time: Option<u64>,
}

impl TreeUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.tree_state.is_none()
            && self.private_key.is_none()
    }

    fn reject_immutable(&self) -> Result<()> {
        let touched = [
            (self.tree_id.is_some(), "tree_id"),
            (self.tree_type.is_some(), "tree_type"),
            (self.hash_strategy.is_some(), "hash_strategy"),
            (self.hash_algorithm.is_some(), "hash_algorithm"),
            (self.signature_algorithm.is_some(), "signature_algorithm"),
            (self.duplicate_policy.is_some(), "duplicate_policy"),
            (self.create_time.is_some(), "create_time"),
        ];
        match touched.iter().find(|(set, _)| *set) {
            Some((_, field)) => Err(KernelError::ImmutableField(field)),
            None => Ok(()),
        }
    }
}

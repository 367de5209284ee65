// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Wire-level vocabulary shared by every Arbor component.

pub mod id;
pub mod enums;

pub use enums::{DuplicatePolicy, HashAlgorithm, HashStrategy, SignatureAlgorithm, TreeState, TreeType};
pub use id::{Revision, TreeId};

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! arbor-kernel: deterministic, no_std tree state and root commitment rules
//! for verifiable logs and maps.
//!
//! Everything here is pure: no clocks, no I/O, no signing. Callers pass
//! `now` explicitly and hand canonical bytes to their own signer.

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod error;
pub mod types;
pub mod keys;
pub mod tree;
pub mod lifecycle;
pub mod root;

pub use error::{KernelError, KernelResult};
pub use keys::PrivateKeyRef;
pub use root::{DigitallySigned, LogRoot, MapRoot, MapRootMetadata, SignedLogRoot, SignedMapRoot};
pub use tree::{NewTree, Tree, TreeUpdate};
pub use types::*;

#[cfg(test)]
pub mod tests;

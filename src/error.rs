//! Error types.

use core::fmt;

use crate::types::TreeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Unknown enum sentinel or unsupported parameter combination.
    InvalidConfiguration(&'static str),
    /// Malformed request that is not a configuration problem.
    InvalidArgument(&'static str),
    /// Update touched a field fixed at creation.
    ImmutableField(&'static str),
    /// Tree absent, soft-deleted or hard-deleted. Deliberately indistinguishable.
    TreeNotFound,
    /// Write attempted on a tree that is not ACTIVE.
    TreeFrozen,
    /// Move not present in the lifecycle graph.
    IllegalTransition { from: TreeState, to: TreeState },
    /// Candidate root regresses size or high-water marks.
    NonMonotonicCommitment,
    /// Root hash length does not match the tree's hash strategy.
    InvalidRootHash { expected: usize, actual: usize },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::InvalidConfiguration(reason) => write!(f, "invalid tree configuration: {}", reason),
            KernelError::InvalidArgument(reason) => write!(f, "invalid argument: {}", reason),
            KernelError::ImmutableField(field) => write!(f, "field {} is immutable", field),
            KernelError::TreeNotFound => write!(f, "tree not found"),
            KernelError::TreeFrozen => write!(f, "tree is not accepting writes"),
            KernelError::IllegalTransition { from, to } => {
                write!(f, "illegal state transition {} -> {}", from.name(), to.name())
            }
            KernelError::NonMonotonicCommitment => write!(f, "candidate root regresses the latest committed root"),
            KernelError::InvalidRootHash { expected, actual } => {
                write!(f, "root hash must be {} bytes, got {}", expected, actual)
            }
        }
    }
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
pub type Result<T> = KernelResult<T>;

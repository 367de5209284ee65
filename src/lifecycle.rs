// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Tree Lifecycle State Machine
//!
//! ```text
//!            freeze / unfreeze
//!   ACTIVE  <------------------>  FROZEN
//!     ^  \                       /
//!     |   \ soft delete         / soft delete
//!     |    v                   v
//!     +--- SOFT_DELETED <------+
//!  undelete     |
//! (before expiry)| expiry or forced
//!               v
//!         HARD_DELETED  (terminal, id retired)
//! ```
//!
//! Every function validates before it mutates, so a rejected transition
//! leaves the tree exactly as it was.

use crate::error::{KernelError, Result};
use crate::tree::Tree;
use crate::types::TreeState;

/// The complete transition graph. Nothing else may move a tree.
pub fn is_legal_transition(from: TreeState, to: TreeState) -> bool {
    use TreeState::*;
    matches!(
        (from, to),
        (Active, Frozen)
            | (Frozen, Active)
            | (Active, SoftDeleted)
            | (Frozen, SoftDeleted)
            | (SoftDeleted, Active)
            | (SoftDeleted, HardDeleted)
    )
}

/// Checks an administrator-requested ACTIVE/FROZEN change. Re-asserting the
/// current state is accepted as a no-op.
pub fn check_serving_transition(from: TreeState, to: TreeState) -> Result<()> {
    if !from.is_serving() {
        return Err(KernelError::TreeNotFound);
    }
    if !to.is_serving() {
        return Err(KernelError::IllegalTransition { from, to });
    }
    if from == to || is_legal_transition(from, to) {
        Ok(())
    } else {
        Err(KernelError::IllegalTransition { from, to })
    }
}

pub fn set_serving_state(tree: &mut Tree, to: TreeState, now: u64) -> Result<()> {
    check_serving_transition(tree.tree_state, to)?;
    tree.tree_state = to;
    tree.touch(now);
    Ok(())
}

/// ACTIVE|FROZEN -> SOFT_DELETED. Starts the retention timer.
pub fn soft_delete(tree: &mut Tree, now: u64) -> Result<()> {
    tree.ensure_readable()?;
    tree.tree_state = TreeState::SoftDeleted;
    tree.delete_time = Some(now);
    tree.touch(now);
    Ok(())
}

/// True once a soft-deleted tree has outlived its retention window.
pub fn retention_expired(tree: &Tree, now: u64, retention_nanos: u64) -> bool {
    if tree.tree_state != TreeState::SoftDeleted {
        return false;
    }
    match tree.delete_time {
        Some(deleted_at) => now >= deleted_at.saturating_add(retention_nanos),
        None => false,
    }
}

/// SOFT_DELETED -> ACTIVE, only before expiry. An expired tree is as good as
/// gone and reports `TreeNotFound`.
pub fn undelete(tree: &mut Tree, now: u64, retention_nanos: u64) -> Result<()> {
    match tree.tree_state {
        TreeState::SoftDeleted => {}
        TreeState::Active | TreeState::Frozen => {
            return Err(KernelError::IllegalTransition {
                from: tree.tree_state,
                to: TreeState::Active,
            })
        }
        _ => return Err(KernelError::TreeNotFound),
    }
    if retention_expired(tree, now, retention_nanos) {
        return Err(KernelError::TreeNotFound);
    }

    tree.tree_state = TreeState::Active;
    tree.delete_time = None;
    tree.touch(now);
    Ok(())
}

/// SOFT_DELETED -> HARD_DELETED. Automatic callers pass `force = false` and
/// only succeed after expiry; administrators may force it earlier.
pub fn hard_delete(tree: &mut Tree, now: u64, retention_nanos: u64, force: bool) -> Result<()> {
    match tree.tree_state {
        TreeState::SoftDeleted => {}
        TreeState::Active | TreeState::Frozen => {
            return Err(KernelError::IllegalTransition {
                from: tree.tree_state,
                to: TreeState::HardDeleted,
            })
        }
        _ => return Err(KernelError::TreeNotFound),
    }
    if !force && !retention_expired(tree, now, retention_nanos) {
        return Err(KernelError::InvalidArgument("retention period has not expired"));
    }

    tree.tree_state = TreeState::HardDeleted;
    tree.touch(now);
    Ok(())
}

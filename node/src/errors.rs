// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use arbor_kernel::{KernelError, Revision, TreeId, TreeState};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::signer::SignerError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Kernel(KernelError),
    #[error("invalid tree configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("tree {tree_id} has no root at {}", describe_revision(.revision))]
    RootNotFound { tree_id: TreeId, revision: Option<Revision> },
    #[error("revision conflict: expected latest revision {expected}, found {current}")]
    RevisionConflict { expected: Revision, current: Revision },
    #[error("signing failed: {0}")]
    SigningFailure(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

fn describe_revision(revision: &Option<Revision>) -> String {
    match revision {
        Some(r) => format!("revision {}", r),
        None => "any revision".to_string(),
    }
}

impl ServiceError {
    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Kernel(k) => match k {
                KernelError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
                KernelError::InvalidArgument(_) => "INVALID_ARGUMENT",
                KernelError::ImmutableField(_) => "IMMUTABLE_FIELD",
                KernelError::TreeNotFound => "TREE_NOT_FOUND",
                KernelError::TreeFrozen => "TREE_FROZEN",
                KernelError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
                KernelError::NonMonotonicCommitment => "NON_MONOTONIC_COMMITMENT",
                KernelError::InvalidRootHash { .. } => "INVALID_ROOT_HASH",
            },
            ServiceError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            ServiceError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ServiceError::RootNotFound { .. } => "ROOT_NOT_FOUND",
            ServiceError::RevisionConflict { .. } => "REVISION_CONFLICT",
            ServiceError::SigningFailure(_) => "SIGNING_FAILURE",
            ServiceError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Kernel(k) => match k {
                KernelError::TreeNotFound => StatusCode::NOT_FOUND,
                KernelError::TreeFrozen
                | KernelError::IllegalTransition { .. }
                | KernelError::NonMonotonicCommitment => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
            ServiceError::InvalidConfiguration(_) | ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServiceError::RootNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::RevisionConflict { .. } => StatusCode::CONFLICT,
            ServiceError::SigningFailure(_) | ServiceError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

impl From<KernelError> for ServiceError {
    fn from(e: KernelError) -> Self {
        ServiceError::Kernel(e)
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            // Missing and deleted trees are indistinguishable to callers.
            StorageError::NotFound(_) => ServiceError::Kernel(KernelError::TreeNotFound),
            StorageError::NotWritable { state, .. } => match state {
                TreeState::Frozen => ServiceError::Kernel(KernelError::TreeFrozen),
                _ => ServiceError::Kernel(KernelError::TreeNotFound),
            },
            StorageError::Conflict { expected, current } => ServiceError::RevisionConflict { expected, current },
            StorageError::Rejected(k) => ServiceError::Kernel(k),
            StorageError::Unavailable(msg) | StorageError::Io(msg) => ServiceError::Storage(msg),
        }
    }
}

impl From<SignerError> for ServiceError {
    fn from(e: SignerError) -> Self {
        ServiceError::SigningFailure(e.to_string())
    }
}

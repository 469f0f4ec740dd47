//! Reconciliation error types

use stackflow_api::ApiError;
use std::time::Duration;
use thiserror::Error;

/// Reconciliation errors. Every variant is fatal for the resource being
/// reconciled; nothing here is retried.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Remote call failed, either at the transport or with an embedded error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} is required but was not given")]
    MissingScope { kind: String },

    #[error("{kind} state is '{status}', not {expected}")]
    InvalidState {
        kind: String,
        status: String,
        expected: String,
    },

    #[error("async job {job_id} did not finish within {elapsed:?}")]
    Timeout { job_id: String, elapsed: Duration },

    #[error("async job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} does not support state '{state}'")]
    UnsupportedState { kind: String, state: String },
}

impl ReconcileError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

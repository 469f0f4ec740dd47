//! CloudStack API error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API command name must not be empty")]
    InvalidCommand,

    /// Any failure of a remote call, normalized. Carries the command name
    /// so the caller can tell which step of a reconciliation failed.
    #[error("{command}: {message}")]
    Remote { command: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    pub fn remote(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            command: command.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

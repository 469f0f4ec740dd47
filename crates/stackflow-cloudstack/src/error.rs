//! Manifest error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Resource #{index} ({kind}): {message}")]
    Invalid {
        index: usize,
        kind: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ManifestError>;

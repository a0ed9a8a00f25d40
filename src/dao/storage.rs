use std::{error::Error, path::PathBuf};
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing medium cannot be used at all.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable description.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Writing the score file failed.
    #[error("failed to write `{path}`")]
    Write {
        /// File being written.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The ledger could not be encoded.
    #[error("failed to encode score ledger")]
    Encode(#[source] serde_json::Error),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

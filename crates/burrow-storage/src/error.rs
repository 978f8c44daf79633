use http::StatusCode;
use thiserror::Error;

/// Result type for object-store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("object store answered {0}")]
    Status(StatusCode),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    #[error("object store request timed out: {0}")]
    Timeout(String),
    #[error("object store request is invalid: {0}")]
    InvalidRequest(String),
    #[error("object store operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// The status the store answered with, if the failure came from a
    /// response rather than from the transport.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            StorageError::Status(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            StorageError::Timeout(message)
        } else if err.is_connect() {
            StorageError::Unavailable(message)
        } else if err.is_builder() {
            StorageError::InvalidRequest(message)
        } else {
            StorageError::Operation(message)
        }
    }
}

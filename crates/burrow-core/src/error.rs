use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("checksum input of {input} bytes does not fit padding length {padding_len}")]
    PaddingTooShort { input: usize, padding_len: usize },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob is stored under the given hash.
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored hash string is not a valid SHA-256 hex digest.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The requested object was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The object key is malformed.
    #[error("invalid blob key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The stream length did not match the declared size.
    #[error("size mismatch for {key}: declared {declared} bytes, read {actual}")]
    SizeMismatch {
        key: String,
        declared: u64,
        actual: u64,
    },

    /// Serialization failure for object attributes.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests right now.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;

//! Error types for metadata document operations.

use thiserror::Error;

/// Errors that can occur during metadata store operations.
#[derive(Debug, Error)]
pub enum MetaError {
    /// The document id is malformed.
    #[error("invalid document id: {0:?}")]
    InvalidId(String),

    /// A document with this id already exists.
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based document operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests right now.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for metadata operations.
pub type Result<T> = std::result::Result<T, MetaError>;

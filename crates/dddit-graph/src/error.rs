//! Error types for the graph store.

use dddit_types::TypeError;

use crate::model::VertexId;

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A vertex id did not resolve.
    #[error("vertex not found: {0}")]
    VertexNotFound(VertexId),

    /// A named entity (repository, resource, branch, version) was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Attempted to create an entity that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Attempted to create an entity under a parent that does not exist.
    #[error("parent not found: {0}")]
    ParentNotFound(String),

    /// A branch chain violates the single-head, no-fork, acyclic shape.
    #[error("corrupt chain on {branch}: {reason}")]
    CorruptChain {
        /// The branch whose chain is corrupt.
        branch: String,
        /// What was wrong.
        reason: String,
    },

    /// A vertex is missing a property or carries an unparsable value.
    #[error("malformed vertex {vertex}: {reason}")]
    MalformedVertex {
        /// The offending vertex.
        vertex: VertexId,
        /// What was wrong.
        reason: String,
    },

    /// A name or coordinate failed validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests.
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;

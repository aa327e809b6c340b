//! Error types for the commit engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use dddit_blob::BlobError;
use dddit_graph::GraphError;
use dddit_meta::MetaError;

/// The stage of a commit at which it failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitStage {
    /// Writing the payload to the blob store.
    Blob,
    /// Writing the metadata document.
    Metadata,
    /// The target branch does not exist in the graph.
    BranchNotFound,
    /// Creating or linking the version vertex.
    Graph,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blob => "BLOB",
            Self::Metadata => "METADATA",
            Self::BranchNotFound => "BRANCH_NOT_FOUND",
            Self::Graph => "GRAPH",
        })
    }
}

/// Errors surfaced by [`crate::VersionEngine`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A lookup traversal found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The commit pipeline failed. State may be partially persisted if
    /// compensation itself failed; retry with a fresh version name.
    #[error("commit failed at {stage}: {cause}")]
    Commit { stage: CommitStage, cause: String },

    /// An underlying store failed for infrastructure reasons.
    #[error("{store} store unavailable: {cause}")]
    StoreUnavailable { store: &'static str, cause: String },

    /// A commit precondition was rejected.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn unavailable(store: &'static str, cause: impl fmt::Display) -> Self {
        Self::StoreUnavailable {
            store,
            cause: cause.to_string(),
        }
    }

    /// The failed stage, if this is a commit failure.
    pub fn stage(&self) -> Option<CommitStage> {
        match self {
            Self::Commit { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<BlobError> for EngineError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::NotFound(key) => Self::NotFound(format!("blob {key}")),
            other => Self::unavailable("blob", other),
        }
    }
}

impl From<MetaError> for EngineError {
    fn from(e: MetaError) -> Self {
        Self::unavailable("metadata", e)
    }
}

impl From<GraphError> for EngineError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::NotFound(what) => Self::NotFound(what),
            GraphError::Type(e) => Self::Validation(e.to_string()),
            other => Self::unavailable("graph", other),
        }
    }
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

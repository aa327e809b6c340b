use thiserror::Error;

use crate::names::NameKind;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: NameKind,
        name: String,
        reason: String,
    },

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("locator {locator:?} does not start with {expected:?}")]
    ForeignLocator { locator: String, expected: String },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

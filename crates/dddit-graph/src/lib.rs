//! Graph relationship store for dddit.
//!
//! The graph is the system of record for structure: who owns which
//! repository, which resources a repository contains, which branches a
//! resource has, and the per-branch version chain.
//!
//! # Shape
//!
//! ```text
//! User -OWNS/CONTRIBUTES_TO-> Repository -CONTAINS-> Resource -HAS_BRANCH-> Branch
//! Branch -HAS_VERSION-> v1 -HAS_NEXT_VERSION-> v2 -HAS_NEXT_VERSION-> v3
//! ```
//!
//! A version chain is singly linked and append-only: one head, one tail, no
//! forks and no cycles. [`GraphStore::add_edge_if_vacant`] is the primitive
//! that lets concurrent appenders preserve that shape.
//!
//! # Modules
//!
//! - [`error`]: Error types for graph operations
//! - [`model`]: Vertex and edge labels, [`VertexId`], property maps
//! - [`traits`]: The [`GraphStore`] trait defining the storage interface
//! - [`memory`]: In-memory [`InMemoryGraph`]
//! - [`file`]: JSON snapshot-backed [`FileGraphStore`]
//! - [`query`]: Branch lookup and chain traversal
//! - [`catalog`]: Users, repositories, resources and branches
//! - [`audit`]: [`ChainAudit`] integrity checks over a branch chain

pub mod audit;
pub mod catalog;
pub mod error;
pub mod file;
pub mod memory;
pub mod model;
pub mod query;
pub mod traits;

pub use audit::{ChainAudit, ChainReport, ChainViolation, ChainViolationKind};
pub use catalog::Catalog;
pub use error::{GraphError, GraphResult};
pub use file::FileGraphStore;
pub use memory::{GraphState, InMemoryGraph};
pub use model::{keys, Edge, EdgeLabel, Label, Properties, Vertex, VertexId};
pub use traits::GraphStore;

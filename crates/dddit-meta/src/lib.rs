//! Metadata document storage for dddit.
//!
//! Each committed version owns exactly one [`MetadataDocument`]: author,
//! timestamp, comment, tags and the locator of its payload in blob storage.
//! Documents are immutable once written and are keyed by a generated
//! [`DocumentId`].
//!
//! # Modules
//!
//! - [`error`]: Error types for document operations
//! - [`document`]: [`MetadataDocument`] and [`DocumentId`]
//! - [`traits`]: The [`MetadataStore`] trait defining the storage interface
//! - [`memory`]: In-memory [`InMemoryMetadataStore`] for tests
//! - [`fs`]: One-JSON-file-per-document [`FsMetadataStore`]

pub mod document;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use document::{DocumentId, MetadataDocument};
pub use error::{MetaError, Result};
pub use fs::FsMetadataStore;
pub use memory::InMemoryMetadataStore;
pub use traits::MetadataStore;

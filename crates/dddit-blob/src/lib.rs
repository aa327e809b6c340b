//! Blob storage for dddit.
//!
//! Raw payload bytes (mesh files, material textures) live in a flat object
//! namespace addressed by keys of the form
//! `bucket/repository/resource/branch/version/filename`. The store never
//! interprets object contents.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`]: `BTreeMap`-based store for tests and embedding
//! - [`FsBlobStore`]: one file per object under a root directory
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; a second `put` to the same key
//!    replaces the object wholesale.
//! 2. Deleting an absent object is a no-op that reports `false`.
//! 3. Prefix listings are flat: every object whose key starts with the prefix.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod digest;
pub mod error;
pub mod fs;
pub mod memory;
pub mod path;
pub mod traits;

pub use digest::initial_capacity;
pub use error::{BlobError, BlobResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use path::{file_name, folder_prefix, object_key, validate_key};
pub use traits::{BlobInfo, BlobObject, BlobReader, BlobStore};

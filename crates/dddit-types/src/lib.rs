//! Foundation types for dddit, a version-control backend for binary 3D assets.
//!
//! Every other dddit crate depends on `dddit-types`. Assets are organized as
//! repositories → resources → branches → linear version chains.
//!
//! # Key Types
//!
//! - [`BranchKey`] / [`VersionKey`]: Coordinates of a branch or a version
//! - [`ResourceType`]: Mesh or material payload kind
//! - [`LocatorScheme`]: Opaque cross-store references built by prefixing
//! - [`VersionRecord`]: The descriptive fields a version carries
//! - [`validate_name`]: Naming rules shared by every path segment

pub mod error;
pub mod key;
pub mod locator;
pub mod names;
pub mod resource;
pub mod version;

pub use error::TypeError;
pub use key::{BranchKey, ResourceKey, VersionKey};
pub use locator::LocatorScheme;
pub use names::{validate_filename, validate_name, NameKind};
pub use resource::ResourceType;
pub use version::{
    decode_tags, encode_tags, format_timestamp, parse_timestamp, NewVersion, VersionRecord,
    ANONYMOUS_USER,
};

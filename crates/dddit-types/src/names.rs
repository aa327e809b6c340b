//! Naming rules for repositories, resources, branches, versions and files.
//!
//! Every name ends up as one segment of a blob object key
//! (`bucket/repository/resource/branch/version/filename`), so a valid name:
//! - Must be non-empty and not consist only of whitespace
//! - Must not contain `/` or `\`
//! - Must not contain control characters
//! - Must not be `.` or `..`
//! - Must not have leading or trailing whitespace

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Which kind of entity a name belongs to. Used only for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameKind {
    User,
    Repository,
    Resource,
    Branch,
    Version,
    File,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Repository => "repository",
            Self::Resource => "resource",
            Self::Branch => "branch",
            Self::Version => "version",
            Self::File => "file",
        };
        f.write_str(s)
    }
}

/// Characters that are forbidden anywhere in a name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\'];

/// Validate a name of the given kind, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use dddit_types::{validate_name, NameKind};
///
/// assert!(validate_name(NameKind::Branch, "main").is_ok());
/// assert!(validate_name(NameKind::Resource, "charA").is_ok());
/// assert!(validate_name(NameKind::Version, "").is_err());
/// assert!(validate_name(NameKind::Version, "v1/evil").is_err());
/// ```
pub fn validate_name(kind: NameKind, name: &str) -> Result<(), TypeError> {
    let reject = |reason: String| TypeError::InvalidName {
        kind,
        name: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(reject("must not be empty".into()));
    }

    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(reject(format!("contains forbidden character: {ch:?}")));
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(reject(format!("contains control character: {ch:?}")));
    }

    if name == "." || name == ".." {
        return Err(reject("must not be a relative path component".into()));
    }

    if name.trim() != name {
        return Err(reject("must not have leading or trailing whitespace".into()));
    }

    Ok(())
}

/// Validate an uploaded file name. Same rules as entity names.
pub fn validate_filename(name: &str) -> Result<(), TypeError> {
    validate_name(NameKind::File, name)
}

//! Object key composition.
//!
//! Keys are `bucket/repository/resource/branch/version/filename`. A material
//! folder is the same key without the filename and with a trailing slash.

use dddit_types::{validate_filename, VersionKey};

use crate::error::{BlobError, BlobResult};

/// Key of a single object belonging to a version.
pub fn object_key(bucket: &str, version: &VersionKey, filename: &str) -> String {
    format!("{}{}", folder_prefix(bucket, version), filename)
}

/// Folder prefix shared by every object of a version, with a trailing slash.
pub fn folder_prefix(bucket: &str, version: &VersionKey) -> String {
    let [repository, resource, branch, name] = version.segments();
    format!("{bucket}/{repository}/{resource}/{branch}/{name}/")
}

/// Last path segment of a key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Validate an object key before it touches a backend.
pub fn validate_key(key: &str) -> BlobResult<()> {
    let reject = |reason: &str| BlobError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() {
        return Err(reject("must not be empty"));
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(reject("must not start or end with '/'"));
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return Err(reject("segments must not be empty"));
        }
        validate_filename(segment).map_err(|e| reject(&e.to_string()))?;
    }
    Ok(())
}

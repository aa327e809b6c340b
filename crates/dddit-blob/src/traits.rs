use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::digest::initial_capacity;
use crate::error::BlobResult;
use crate::path::file_name;

/// Stream over an object's bytes.
pub type BlobReader = Box<dyn Read + Send>;

/// Attributes recorded for every stored object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type supplied on upload.
    pub content_type: String,
    /// Hex BLAKE3 digest of the content.
    pub digest: String,
}

impl BlobInfo {
    /// The filename part of the key.
    pub fn file_name(&self) -> &str {
        file_name(&self.key)
    }
}

/// An object returned by [`BlobStore::get`].
pub struct BlobObject {
    pub info: BlobInfo,
    pub reader: BlobReader,
}

impl BlobObject {
    /// Drain the reader into memory.
    pub fn into_bytes(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(initial_capacity(self.info.size));
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for BlobObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobObject")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Durable storage for raw payload bytes.
///
/// All implementations must satisfy these invariants:
/// - `put` reads exactly `size` bytes; a shorter or longer stream is an error
///   and leaves no object behind.
/// - `delete` on an absent key is not an error; it returns `Ok(false)`.
/// - `list_by_prefix` returns every key starting with the prefix, in no
///   particular order guaranteed to callers.
/// - Handles are shared process-wide and carry no per-call mutable state.
pub trait BlobStore: Send + Sync {
    /// Store an object under `key`, reading `size` bytes from `data`.
    fn put(&self, key: &str, data: &mut dyn Read, size: u64, content_type: &str)
        -> BlobResult<BlobInfo>;

    /// Open an object for reading.
    ///
    /// Returns `Err(BlobError::NotFound)` if the object does not exist.
    fn get(&self, key: &str) -> BlobResult<BlobObject>;

    /// Delete an object. Returns `true` if the object existed.
    fn delete(&self, key: &str) -> BlobResult<bool>;

    /// List every object key starting with `prefix`.
    fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>>;

    /// Check whether an object exists.
    fn exists(&self, key: &str) -> BlobResult<bool>;
}

impl<T: BlobStore + ?Sized> BlobStore for std::sync::Arc<T> {
    fn put(
        &self,
        key: &str,
        data: &mut dyn Read,
        size: u64,
        content_type: &str,
    ) -> BlobResult<BlobInfo> {
        (**self).put(key, data, size, content_type)
    }

    fn get(&self, key: &str) -> BlobResult<BlobObject> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> BlobResult<bool> {
        (**self).delete(key)
    }

    fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>> {
        (**self).list_by_prefix(prefix)
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        (**self).exists(key)
    }
}

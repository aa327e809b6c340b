use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::RwLock;

use tracing::debug;

use crate::digest::{copy_hashed, initial_capacity};
use crate::error::{BlobError, BlobResult};
use crate::path::validate_key;
use crate::traits::{BlobInfo, BlobObject, BlobStore};

struct StoredBlob {
    info: BlobInfo,
    data: Vec<u8>,
}

/// In-memory, BTreeMap-based blob store.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock`;
/// reads hand out a cursor over a copy of the bytes.
pub struct InMemoryBlobStore {
    objects: RwLock<BTreeMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(
        &self,
        key: &str,
        data: &mut dyn Read,
        size: u64,
        content_type: &str,
    ) -> BlobResult<BlobInfo> {
        validate_key(key)?;
        let mut buf = Vec::with_capacity(initial_capacity(size));
        let (actual, digest) = copy_hashed(data, &mut buf)?;
        if actual != size {
            return Err(BlobError::SizeMismatch {
                key: key.to_string(),
                declared: size,
                actual,
            });
        }
        let info = BlobInfo {
            key: key.to_string(),
            size,
            content_type: content_type.to_string(),
            digest,
        };
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(
            key.to_string(),
            StoredBlob {
                info: info.clone(),
                data: buf,
            },
        );
        debug!(key, size, "stored blob");
        Ok(info)
    }

    fn get(&self, key: &str) -> BlobResult<BlobObject> {
        let map = self.objects.read().expect("lock poisoned");
        let blob = map
            .get(key)
            .ok_or_else(|| BlobError::NotFound(key.to_string()))?;
        Ok(BlobObject {
            info: blob.info.clone(),
            reader: Box::new(Cursor::new(blob.data.clone())),
        })
    }

    fn delete(&self, key: &str) -> BlobResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_bytes(store: &InMemoryBlobStore, key: &str, data: &[u8]) -> BlobInfo {
        store
            .put(key, &mut &data[..], data.len() as u64, "application/octet-stream")
            .unwrap()
    }

    #[test]
    fn put_and_get() {
        let store = InMemoryBlobStore::new();
        let info = put_bytes(&store, "meshes/g/r/main/v1/a.fbx", b"vertices");
        assert_eq!(info.size, 8);
        assert_eq!(info.file_name(), "a.fbx");

        let object = store.get("meshes/g/r/main/v1/a.fbx").unwrap();
        assert_eq!(object.info, info);
        assert_eq!(object.into_bytes().unwrap(), b"vertices");
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryBlobStore::new();
        let err = store.get("meshes/nope").unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }

    #[test]
    fn size_mismatch_stores_nothing() {
        let store = InMemoryBlobStore::new();
        let err = store
            .put("meshes/x", &mut &b"abc"[..], 10, "model/obj")
            .unwrap_err();
        assert!(matches!(err, BlobError::SizeMismatch { declared: 10, actual: 3, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn absurd_declared_size_is_a_mismatch() {
        let store = InMemoryBlobStore::new();
        let err = store
            .put("meshes/huge", &mut &b"abc"[..], u64::MAX, "model/obj")
            .unwrap_err();
        assert!(matches!(err, BlobError::SizeMismatch { actual: 3, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_absent_is_noop() {
        let store = InMemoryBlobStore::new();
        assert!(!store.delete("meshes/never").unwrap());
        put_bytes(&store, "meshes/once", b"x");
        assert!(store.delete("meshes/once").unwrap());
        assert!(!store.exists("meshes/once").unwrap());
        assert!(!store.delete("meshes/once").unwrap());
    }

    #[test]
    fn prefix_listing_is_flat_and_bounded() {
        let store = InMemoryBlobStore::new();
        put_bytes(&store, "materials/g/r/main/v1/albedo.png", b"1");
        put_bytes(&store, "materials/g/r/main/v1/normal.png", b"2");
        put_bytes(&store, "materials/g/r/main/v10/albedo.png", b"3");
        put_bytes(&store, "meshes/g/r/main/v1/a.fbx", b"4");

        let keys = store.list_by_prefix("materials/g/r/main/v1/").unwrap();
        assert_eq!(
            keys,
            vec![
                "materials/g/r/main/v1/albedo.png",
                "materials/g/r/main/v1/normal.png"
            ]
        );
    }

    #[test]
    fn rejects_bad_keys() {
        let store = InMemoryBlobStore::new();
        let err = store.put("a/../b", &mut &b"x"[..], 1, "x").unwrap_err();
        assert!(matches!(err, BlobError::InvalidKey { .. }));
    }

    #[test]
    fn len_and_debug() {
        let store = InMemoryBlobStore::default();
        put_bytes(&store, "meshes/a", b"12345");
        put_bytes(&store, "meshes/b", b"123456789");
        assert_eq!(store.len(), 2);
        let debug = format!("{store:?}");
        assert!(debug.contains("object_count"));
    }
}

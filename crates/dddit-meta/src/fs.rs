//! Directory-backed metadata store: one JSON document per file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::document::{DocumentId, MetadataDocument};
use crate::error::{MetaError, Result};
use crate::traits::MetadataStore;

/// A [`MetadataStore`] writing `<root>/<id>.json`.
///
/// Writes go through a temporary file renamed into place, so a document is
/// either fully present or absent.
#[derive(Debug)]
pub struct FsMetadataStore {
    root: PathBuf,
}

impl FsMetadataStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl MetadataStore for FsMetadataStore {
    fn insert(&self, document: &MetadataDocument) -> Result<DocumentId> {
        let id = DocumentId::generate();
        let path = self.path_for(&id);
        if path.exists() {
            return Err(MetaError::AlreadyExists(id.to_string()));
        }
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| MetaError::Serialization(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| MetaError::Io(e.error))?;

        debug!(id = %id, version = %document.version_key(), "stored metadata document");
        Ok(id)
    }

    fn find_by_id(&self, id: &DocumentId) -> Result<Option<MetadataDocument>> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| MetaError::Serialization(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_by_id(&self, id: &DocumentId) -> Result<bool> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc() -> MetadataDocument {
        MetadataDocument {
            repository_name: "game".into(),
            resource_name: "rock".into(),
            branch_name: "main".into(),
            version_name: "v1".into(),
            username: "anonymous".into(),
            pushed_at: Utc::now(),
            comment: "scan".into(),
            tags: vec!["photogrammetry".into()],
            blob_locator: "blob://local/meshes/game/rock/main/v1/rock.obj".into(),
        }
    }

    #[test]
    fn insert_find_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMetadataStore::open(dir.path()).unwrap();
        let original = doc();
        let id = store.insert(&original).unwrap();

        assert_eq!(store.find_by_id(&id).unwrap(), Some(original));
        assert!(store.delete_by_id(&id).unwrap());
        assert!(!store.delete_by_id(&id).unwrap());
        assert!(store.find_by_id(&id).unwrap().is_none());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FsMetadataStore::open(dir.path()).unwrap();
            store.insert(&doc()).unwrap()
        };
        let store = FsMetadataStore::open(dir.path()).unwrap();
        assert!(store.exists(&id).unwrap());
    }

    #[test]
    fn corrupt_document_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMetadataStore::open(dir.path()).unwrap();
        let id = DocumentId::generate();
        fs::write(dir.path().join(format!("{id}.json")), b"{not json").unwrap();
        assert!(matches!(
            store.find_by_id(&id).unwrap_err(),
            MetaError::Serialization(_)
        ));
    }
}

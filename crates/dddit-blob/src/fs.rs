//! Filesystem-backed blob store.
//!
//! Layout under the root directory:
//!
//! ```text
//! objects/<key>        object bytes
//! attrs/<key>.json     BlobInfo (content type, size, digest)
//! ```
//!
//! Every write goes to a temporary file in the destination directory and is
//! renamed into place, so readers never observe a partially written object.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::digest::copy_hashed;
use crate::error::{BlobError, BlobResult};
use crate::path::validate_key;
use crate::traits::{BlobInfo, BlobObject, BlobStore};

const OBJECTS_DIR: &str = "objects";
const ATTRS_DIR: &str = "attrs";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Blob store keeping one file per object under a root directory.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> BlobResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(OBJECTS_DIR))?;
        fs::create_dir_all(root.join(ATTRS_DIR))?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        join_key(&self.root.join(OBJECTS_DIR), key)
    }

    fn attrs_path(&self, key: &str) -> PathBuf {
        let mut path = join_key(&self.root.join(ATTRS_DIR), key);
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".json");
        path.set_file_name(name);
        path
    }

    fn read_attrs(&self, key: &str, object: &File) -> BlobResult<BlobInfo> {
        match fs::read(self.attrs_path(key)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| BlobError::Serialization(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(key, "blob attributes missing; using defaults");
                Ok(BlobInfo {
                    key: key.to_string(),
                    size: object.metadata()?.len(),
                    content_type: DEFAULT_CONTENT_TYPE.to_string(),
                    digest: String::new(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn join_key(base: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

fn temp_in(path: &Path) -> io::Result<NamedTempFile> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    NamedTempFile::new_in(parent)
}

fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

impl BlobStore for FsBlobStore {
    fn put(
        &self,
        key: &str,
        data: &mut dyn Read,
        size: u64,
        content_type: &str,
    ) -> BlobResult<BlobInfo> {
        validate_key(key)?;
        let object_path = self.object_path(key);

        let mut tmp = temp_in(&object_path)?;
        let (actual, digest) = copy_hashed(data, tmp.as_file_mut())?;
        if actual != size {
            return Err(BlobError::SizeMismatch {
                key: key.to_string(),
                declared: size,
                actual,
            });
        }
        tmp.as_file().sync_all()?;

        let info = BlobInfo {
            key: key.to_string(),
            size,
            content_type: content_type.to_string(),
            digest,
        };
        let attrs = serde_json::to_vec_pretty(&info)
            .map_err(|e| BlobError::Serialization(e.to_string()))?;
        let attrs_path = self.attrs_path(key);
        let mut attrs_tmp = temp_in(&attrs_path)?;
        attrs_tmp.write_all(&attrs)?;

        tmp.persist(&object_path).map_err(|e| BlobError::Io(e.error))?;
        if let Err(e) = attrs_tmp.persist(&attrs_path) {
            remove_if_present(&object_path)?;
            return Err(BlobError::Io(e.error));
        }

        debug!(key, size, "stored blob on disk");
        Ok(info)
    }

    fn get(&self, key: &str) -> BlobResult<BlobObject> {
        validate_key(key)?;
        let file = match File::open(self.object_path(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let info = self.read_attrs(key, &file)?;
        Ok(BlobObject {
            info,
            reader: Box::new(BufReader::new(file)),
        })
    }

    fn delete(&self, key: &str) -> BlobResult<bool> {
        validate_key(key)?;
        let existed = remove_if_present(&self.object_path(key))?;
        remove_if_present(&self.attrs_path(key))?;
        Ok(existed)
    }

    fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>> {
        if prefix.split('/').any(|s| s == "." || s == "..") {
            return Err(BlobError::InvalidKey {
                key: prefix.to_string(),
                reason: "prefix must not contain relative components".into(),
            });
        }
        let objects_root = self.root.join(OBJECTS_DIR);
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = join_key(&objects_root, dir_part);
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&start) {
            let entry = entry.map_err(|e| BlobError::Io(io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&objects_root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        validate_key(key)?;
        Ok(self.object_path(key).is_file())
    }
}

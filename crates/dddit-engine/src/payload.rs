//! Payloads going into a commit and files coming out of a resolve.

use std::collections::HashSet;
use std::fmt;
use std::io::{Cursor, Read};

use dddit_blob::{initial_capacity, BlobObject, BlobReader};
use dddit_meta::MetadataDocument;
use dddit_types::{validate_filename, ResourceType, VersionRecord};

use crate::error::{EngineError, EngineResult};

/// One file of a payload, streamed into the blob store.
pub struct PayloadFile {
    pub filename: String,
    pub content_type: String,
    /// Exact number of bytes `reader` yields.
    pub size: u64,
    pub reader: BlobReader,
}

impl PayloadFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            size,
            reader: Box::new(reader),
        }
    }

    /// An in-memory file.
    pub fn from_bytes(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(filename, content_type, size, Cursor::new(bytes))
    }
}

impl fmt::Debug for PayloadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// The binary content of a version.
#[derive(Debug)]
pub enum Payload {
    /// A single mesh file.
    Mesh(PayloadFile),
    /// A material: a set of texture files stored under one folder.
    Material(Vec<PayloadFile>),
}

impl Payload {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Mesh(_) => ResourceType::Mesh,
            Self::Material(_) => ResourceType::Material,
        }
    }

    pub fn files(&self) -> &[PayloadFile] {
        match self {
            Self::Mesh(file) => std::slice::from_ref(file),
            Self::Material(files) => files,
        }
    }

    pub fn into_files(self) -> Vec<PayloadFile> {
        match self {
            Self::Mesh(file) => vec![file],
            Self::Material(files) => files,
        }
    }

    /// Check filenames before anything is written.
    ///
    /// A material needs at least one file and its filenames must be
    /// distinct, since they share a folder.
    pub fn check(&self) -> EngineResult<()> {
        if self.files().is_empty() {
            return Err(EngineError::Validation("material payload has no files".into()));
        }
        let mut seen = HashSet::new();
        for file in self.files() {
            validate_filename(&file.filename).map_err(|e| EngineError::Validation(e.to_string()))?;
            if !seen.insert(file.filename.as_str()) {
                return Err(EngineError::Validation(format!(
                    "duplicate filename {}",
                    file.filename
                )));
            }
        }
        Ok(())
    }
}

/// One stored file of a resolved version.
pub struct ResolvedFile {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub reader: BlobReader,
}

impl ResolvedFile {
    /// Drain the reader into memory.
    pub fn into_bytes(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(initial_capacity(self.size));
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl From<BlobObject> for ResolvedFile {
    fn from(object: BlobObject) -> Self {
        Self {
            filename: object.info.file_name().to_string(),
            content_type: object.info.content_type,
            size: object.info.size,
            reader: object.reader,
        }
    }
}

impl fmt::Debug for ResolvedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A version with its payload streams.
#[derive(Debug)]
pub struct ResolvedVersion {
    pub record: VersionRecord,
    pub document: MetadataDocument,
    /// One file for a mesh; every file in the folder for a material.
    pub files: Vec<ResolvedFile>,
}

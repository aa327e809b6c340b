//! The [`MetadataStore`] trait defining the document storage interface.

use crate::document::{DocumentId, MetadataDocument};
use crate::error::Result;

/// Storage backend for version metadata documents.
///
/// Implementations must be thread-safe (`Send + Sync`). Documents are
/// immutable once inserted; the only other mutation is deletion, which the
/// commit engine uses for compensation.
pub trait MetadataStore: Send + Sync {
    /// Insert a document and return its generated id.
    fn insert(&self, document: &MetadataDocument) -> Result<DocumentId>;

    /// Read a document by id.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    fn find_by_id(&self, id: &DocumentId) -> Result<Option<MetadataDocument>>;

    /// Delete a document by id.
    ///
    /// Returns `Ok(true)` if the document existed and was deleted, `Ok(false)`
    /// if it did not exist.
    fn delete_by_id(&self, id: &DocumentId) -> Result<bool>;

    /// Check whether a document exists.
    fn exists(&self, id: &DocumentId) -> Result<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }
}

impl<T: MetadataStore + ?Sized> MetadataStore for std::sync::Arc<T> {
    fn insert(&self, document: &MetadataDocument) -> Result<DocumentId> {
        (**self).insert(document)
    }

    fn find_by_id(&self, id: &DocumentId) -> Result<Option<MetadataDocument>> {
        (**self).find_by_id(id)
    }

    fn delete_by_id(&self, id: &DocumentId) -> Result<bool> {
        (**self).delete_by_id(id)
    }

    fn exists(&self, id: &DocumentId) -> Result<bool> {
        (**self).exists(id)
    }
}

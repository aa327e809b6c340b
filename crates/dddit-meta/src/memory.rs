//! In-memory metadata store for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::document::{DocumentId, MetadataDocument};
use crate::error::{MetaError, Result};
use crate::traits::MetadataStore;

/// An in-memory implementation of [`MetadataStore`].
///
/// All data lives in a `HashMap` behind a `RwLock`. Data is lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    documents: RwLock<HashMap<DocumentId, MetadataDocument>>,
}

impl InMemoryMetadataStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> MetaError {
    MetaError::Unavailable(format!("lock poisoned: {e}"))
}

impl MetadataStore for InMemoryMetadataStore {
    fn insert(&self, document: &MetadataDocument) -> Result<DocumentId> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        let id = DocumentId::generate();
        if documents.contains_key(&id) {
            return Err(MetaError::AlreadyExists(id.to_string()));
        }
        documents.insert(id.clone(), document.clone());
        Ok(id)
    }

    fn find_by_id(&self, id: &DocumentId) -> Result<Option<MetadataDocument>> {
        let documents = self.documents.read().map_err(poisoned)?;
        Ok(documents.get(id).cloned())
    }

    fn delete_by_id(&self, id: &DocumentId) -> Result<bool> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        Ok(documents.remove(id).is_some())
    }
}

//! Fault-injecting store wrappers for engine tests.

use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use dddit_blob::{BlobError, BlobInfo, BlobObject, BlobResult, BlobStore, InMemoryBlobStore};
use dddit_graph::query::version_properties;
use dddit_graph::{
    EdgeLabel, GraphError, GraphResult, GraphStore, InMemoryGraph, Label, Properties, Vertex,
    VertexId,
};
use dddit_meta::{DocumentId, InMemoryMetadataStore, MetaError, MetadataDocument, MetadataStore};
use dddit_types::{ResourceType, VersionRecord};

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FaultyBlobStore {
    inner: InMemoryBlobStore,
    puts_allowed: Mutex<Option<usize>>,
    fail_deletes: AtomicBool,
    deleted: Mutex<Vec<String>>,
}

impl FaultyBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more puts succeed, then fail every put.
    pub fn fail_puts_after(&self, n: usize) {
        *self.puts_allowed.lock().unwrap() = Some(n);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn restore_deletes(&self) {
        self.fail_deletes.store(false, Ordering::SeqCst);
    }

    /// Every key passed to `delete`, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl BlobStore for FaultyBlobStore {
    fn put(
        &self,
        key: &str,
        data: &mut dyn Read,
        size: u64,
        content_type: &str,
    ) -> BlobResult<BlobInfo> {
        if let Some(remaining) = self.puts_allowed.lock().unwrap().as_mut() {
            if *remaining == 0 {
                return Err(BlobError::Unavailable("injected put failure".into()));
            }
            *remaining -= 1;
        }
        self.inner.put(key, data, size, content_type)
    }

    fn get(&self, key: &str) -> BlobResult<BlobObject> {
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> BlobResult<bool> {
        self.deleted.lock().unwrap().push(key.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete(key)
    }

    fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>> {
        self.inner.list_by_prefix(prefix)
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        self.inner.exists(key)
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FaultyMetadataStore {
    inner: InMemoryMetadataStore,
    fail_inserts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FaultyMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl MetadataStore for FaultyMetadataStore {
    fn insert(&self, document: &MetadataDocument) -> dddit_meta::Result<DocumentId> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(MetaError::Unavailable("injected insert failure".into()));
        }
        self.inner.insert(document)
    }

    fn find_by_id(&self, id: &DocumentId) -> dddit_meta::Result<Option<MetadataDocument>> {
        self.inner.find_by_id(id)
    }

    fn delete_by_id(&self, id: &DocumentId) -> dddit_meta::Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(MetaError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete_by_id(id)
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FaultyGraph {
    inner: InMemoryGraph,
    fail_version_vertices: AtomicBool,
    fail_links: AtomicBool,
    fail_removes: AtomicBool,
    /// Appends a rival version into the slot right before the next N
    /// conditional links, as a concurrent writer would.
    rivals: AtomicUsize,
    rival_names: Mutex<Vec<String>>,
}

impl FaultyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_version_vertices(&self) {
        self.fail_version_vertices.store(true, Ordering::SeqCst);
    }

    pub fn fail_links(&self) {
        self.fail_links.store(true, Ordering::SeqCst);
    }

    pub fn fail_removes(&self) {
        self.fail_removes.store(true, Ordering::SeqCst);
    }

    pub fn race_next_links(&self, n: usize) {
        self.rivals.store(n, Ordering::SeqCst);
    }
}

fn rival_record(name: &str) -> VersionRecord {
    VersionRecord {
        name: name.to_string(),
        resource_type: ResourceType::Mesh,
        metadata_locator: "docdb://elsewhere/rival".into(),
        pushed_at: Utc::now(),
        username: "rival".into(),
        comment: String::new(),
        tags: Vec::new(),
    }
}

impl GraphStore for FaultyGraph {
    fn add_vertex(&self, label: Label, properties: Properties) -> GraphResult<VertexId> {
        if label == Label::Version && self.fail_version_vertices.load(Ordering::SeqCst) {
            return Err(GraphError::Unavailable("injected vertex failure".into()));
        }
        self.inner.add_vertex(label, properties)
    }

    fn add_edge(&self, from: VertexId, label: EdgeLabel, to: VertexId) -> GraphResult<()> {
        self.inner.add_edge(from, label, to)
    }

    fn add_edge_if_vacant(
        &self,
        from: VertexId,
        label: EdgeLabel,
        to: VertexId,
    ) -> GraphResult<bool> {
        if self.fail_links.load(Ordering::SeqCst) {
            return Err(GraphError::Unavailable("injected link failure".into()));
        }
        let raced = self
            .rivals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if raced {
            let mut names = self.rival_names.lock().unwrap();
            let name = format!("rival{}", names.len() + 1);
            let rival = self
                .inner
                .add_vertex(Label::Version, version_properties(&rival_record(&name)))?;
            self.inner.add_edge_if_vacant(from, label, rival)?;
            names.push(name);
        }
        self.inner.add_edge_if_vacant(from, label, to)
    }

    fn remove_vertex(&self, id: VertexId) -> GraphResult<bool> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(GraphError::Unavailable("injected remove failure".into()));
        }
        self.inner.remove_vertex(id)
    }

    fn vertex(&self, id: VertexId) -> GraphResult<Vertex> {
        self.inner.vertex(id)
    }

    fn vertices(&self, label: Label, filters: &[(&str, &str)]) -> GraphResult<Vec<VertexId>> {
        self.inner.vertices(label, filters)
    }

    fn out(&self, from: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        self.inner.out(from, label)
    }

    fn inbound(&self, to: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        self.inner.inbound(to, label)
    }
}

//! Graph store persisted as a single JSON snapshot.
//!
//! Several handles, in one process or many, may share a snapshot. Every
//! operation holds an advisory lock on a `<snapshot>.lock` sidecar file:
//! shared for reads, exclusive for writes. A write reloads the snapshot
//! under the exclusive lock, applies the change to it, writes the result to
//! a temporary file next to the snapshot and renames it into place. A
//! failed write leaves the file unchanged, and no handle ever applies a
//! change to a stale copy.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{GraphError, GraphResult};
use crate::memory::GraphState;
use crate::model::{EdgeLabel, Label, Properties, Vertex, VertexId};
use crate::traits::GraphStore;

/// A [`GraphStore`] backed by one JSON file.
#[derive(Debug)]
pub struct FileGraphStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileGraphStore {
    /// Open the snapshot at `path`, starting empty if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let store = Self {
            lock_path: path.with_file_name(lock_name),
            path,
        };
        fs::create_dir_all(store.dir())?;

        let state = store.read(|s| Ok(s.clone()))?;
        info!(
            path = %store.path.display(),
            vertices = state.vertex_count(),
            edges = state.edge_count(),
            "opened graph snapshot"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn lock_file(&self) -> GraphResult<File> {
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?)
    }

    fn load(&self) -> GraphResult<GraphState> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| GraphError::Serialization(e.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(GraphState::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, state: &GraphState) -> GraphResult<()> {
        let bytes =
            serde_json::to_vec(state).map_err(|e| GraphError::Serialization(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| GraphError::Io(e.error))?;
        Ok(())
    }

    fn mutate<R>(&self, apply: impl FnOnce(&mut GraphState) -> GraphResult<R>) -> GraphResult<R> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let mut state = self.load()?;
        let before = state.clone();
        let result = apply(&mut state)?;
        if state != before {
            self.persist(&state)?;
            debug!(path = %self.path.display(), "graph snapshot written");
        }
        drop(lock);
        Ok(result)
    }

    fn read<R>(&self, query: impl FnOnce(&GraphState) -> GraphResult<R>) -> GraphResult<R> {
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let state = self.load()?;
        drop(lock);
        query(&state)
    }
}

impl GraphStore for FileGraphStore {
    fn add_vertex(&self, label: Label, properties: Properties) -> GraphResult<VertexId> {
        self.mutate(|s| Ok(s.add_vertex(label, properties)))
    }

    fn add_edge(&self, from: VertexId, label: EdgeLabel, to: VertexId) -> GraphResult<()> {
        self.mutate(|s| s.add_edge(from, label, to))
    }

    fn add_edge_if_vacant(
        &self,
        from: VertexId,
        label: EdgeLabel,
        to: VertexId,
    ) -> GraphResult<bool> {
        self.mutate(|s| s.add_edge_if_vacant(from, label, to))
    }

    fn remove_vertex(&self, id: VertexId) -> GraphResult<bool> {
        self.mutate(|s| Ok(s.remove_vertex(id)))
    }

    fn vertex(&self, id: VertexId) -> GraphResult<Vertex> {
        self.read(|s| s.vertex(id))
    }

    fn vertices(&self, label: Label, filters: &[(&str, &str)]) -> GraphResult<Vec<VertexId>> {
        self.read(|s| Ok(s.vertices(label, filters)))
    }

    fn out(&self, from: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        self.read(|s| Ok(s.out(from, label)))
    }

    fn inbound(&self, to: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        self.read(|s| Ok(s.inbound(to, label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let (branch, head) = {
            let store = FileGraphStore::open(&path).unwrap();
            let branch = store.add_vertex(Label::Branch, Properties::new()).unwrap();
            let head = store.add_vertex(Label::Version, Properties::new()).unwrap();
            store.add_edge(branch, EdgeLabel::HasVersion, head).unwrap();
            (branch, head)
        };

        let store = FileGraphStore::open(&path).unwrap();
        assert_eq!(store.out(branch, EdgeLabel::HasVersion).unwrap(), vec![head]);
        let next = store.add_vertex(Label::Version, Properties::new()).unwrap();
        assert!(next > head);
    }

    #[test]
    fn failed_write_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let store = FileGraphStore::open(&path).unwrap();
        let a = store.add_vertex(Label::Version, Properties::new()).unwrap();

        assert!(store
            .add_edge(a, EdgeLabel::HasNextVersion, VertexId(404))
            .is_err());
        let reopened = FileGraphStore::open(&path).unwrap();
        assert!(reopened.out(a, EdgeLabel::HasNextVersion).unwrap().is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, b"not a graph").unwrap();
        assert!(matches!(
            FileGraphStore::open(&path).unwrap_err(),
            GraphError::Serialization(_)
        ));
    }

    #[test]
    fn handles_on_one_snapshot_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let first = FileGraphStore::open(&path).unwrap();
        let second = FileGraphStore::open(&path).unwrap();

        let a = first.add_vertex(Label::Branch, Properties::new()).unwrap();
        let b = second.add_vertex(Label::Branch, Properties::new()).unwrap();
        assert_ne!(a, b);

        let reopened = FileGraphStore::open(&path).unwrap();
        assert_eq!(reopened.vertices(Label::Branch, &[]).unwrap().len(), 2);
        assert_eq!(first.vertices(Label::Branch, &[]).unwrap(), vec![a, b]);
    }

    #[test]
    fn vacant_slot_is_claimed_once_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let first = FileGraphStore::open(&path).unwrap();
        let second = FileGraphStore::open(&path).unwrap();

        let tail = first.add_vertex(Label::Version, Properties::new()).unwrap();
        let mine = first.add_vertex(Label::Version, Properties::new()).unwrap();
        let theirs = second.add_vertex(Label::Version, Properties::new()).unwrap();

        assert!(second.add_edge_if_vacant(tail, EdgeLabel::HasNextVersion, theirs).unwrap());
        assert!(!first.add_edge_if_vacant(tail, EdgeLabel::HasNextVersion, mine).unwrap());
        assert_eq!(first.out(tail, EdgeLabel::HasNextVersion).unwrap(), vec![theirs]);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = FileGraphStore::open(&path).unwrap();
                    (0..10)
                        .map(|_| store.add_vertex(Label::Version, Properties::new()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut ids: Vec<VertexId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 40);

        let store = FileGraphStore::open(&path).unwrap();
        assert_eq!(store.vertices(Label::Version, &[]).unwrap().len(), 40);
    }
}

//! In-memory graph store.
//!
//! [`GraphState`] holds the vertices and edges and implements every graph
//! operation as a plain method. [`InMemoryGraph`] puts it behind a `RwLock`;
//! [`crate::FileGraphStore`] reuses it and snapshots it to disk.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::model::{Edge, EdgeLabel, Label, Properties, Vertex, VertexId};
use crate::traits::GraphStore;

/// The complete contents of a graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphState {
    next_id: u64,
    vertices: BTreeMap<VertexId, Vertex>,
    edges: Vec<Edge>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    pub fn add_vertex(&mut self, label: Label, properties: Properties) -> VertexId {
        self.next_id += 1;
        let id = VertexId(self.next_id);
        self.vertices.insert(
            id,
            Vertex {
                id,
                label,
                properties,
            },
        );
        debug!(vertex = %id, %label, "added vertex");
        id
    }

    pub fn add_edge(&mut self, from: VertexId, label: EdgeLabel, to: VertexId) -> GraphResult<()> {
        self.require(from)?;
        self.require(to)?;
        self.edges.push(Edge { from, label, to });
        debug!(%from, %label, %to, "added edge");
        Ok(())
    }

    pub fn add_edge_if_vacant(
        &mut self,
        from: VertexId,
        label: EdgeLabel,
        to: VertexId,
    ) -> GraphResult<bool> {
        self.require(from)?;
        self.require(to)?;
        if self.edges.iter().any(|e| e.from == from && e.label == label) {
            debug!(%from, %label, "edge slot already taken");
            return Ok(false);
        }
        self.edges.push(Edge { from, label, to });
        debug!(%from, %label, %to, "added edge into vacant slot");
        Ok(true)
    }

    pub fn remove_vertex(&mut self, id: VertexId) -> bool {
        if self.vertices.remove(&id).is_none() {
            return false;
        }
        self.edges.retain(|e| e.from != id && e.to != id);
        debug!(vertex = %id, "removed vertex");
        true
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn vertex(&self, id: VertexId) -> GraphResult<Vertex> {
        self.vertices
            .get(&id)
            .cloned()
            .ok_or(GraphError::VertexNotFound(id))
    }

    pub fn vertices(&self, label: Label, filters: &[(&str, &str)]) -> Vec<VertexId> {
        self.vertices
            .values()
            .filter(|v| v.label == label && v.matches(filters))
            .map(|v| v.id)
            .collect()
    }

    pub fn out(&self, from: VertexId, label: EdgeLabel) -> Vec<VertexId> {
        self.edges
            .iter()
            .filter(|e| e.from == from && e.label == label)
            .map(|e| e.to)
            .collect()
    }

    pub fn inbound(&self, to: VertexId, label: EdgeLabel) -> Vec<VertexId> {
        self.edges
            .iter()
            .filter(|e| e.to == to && e.label == label)
            .map(|e| e.from)
            .collect()
    }

    fn require(&self, id: VertexId) -> GraphResult<()> {
        if self.vertices.contains_key(&id) {
            Ok(())
        } else {
            Err(GraphError::VertexNotFound(id))
        }
    }
}

/// An in-memory implementation of [`GraphStore`].
///
/// All data lives in a [`GraphState`] behind a `RwLock` and is lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    state: RwLock<GraphState>,
}

impl InMemoryGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing state.
    pub fn from_state(state: GraphState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> GraphState {
        self.state.read().expect("lock poisoned").clone()
    }
}

impl GraphStore for InMemoryGraph {
    fn add_vertex(&self, label: Label, properties: Properties) -> GraphResult<VertexId> {
        let mut state = self.state.write().expect("lock poisoned");
        Ok(state.add_vertex(label, properties))
    }

    fn add_edge(&self, from: VertexId, label: EdgeLabel, to: VertexId) -> GraphResult<()> {
        self.state
            .write()
            .expect("lock poisoned")
            .add_edge(from, label, to)
    }

    fn add_edge_if_vacant(
        &self,
        from: VertexId,
        label: EdgeLabel,
        to: VertexId,
    ) -> GraphResult<bool> {
        self.state
            .write()
            .expect("lock poisoned")
            .add_edge_if_vacant(from, label, to)
    }

    fn remove_vertex(&self, id: VertexId) -> GraphResult<bool> {
        Ok(self.state.write().expect("lock poisoned").remove_vertex(id))
    }

    fn vertex(&self, id: VertexId) -> GraphResult<Vertex> {
        self.state.read().expect("lock poisoned").vertex(id)
    }

    fn vertices(&self, label: Label, filters: &[(&str, &str)]) -> GraphResult<Vec<VertexId>> {
        Ok(self.state.read().expect("lock poisoned").vertices(label, filters))
    }

    fn out(&self, from: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        Ok(self.state.read().expect("lock poisoned").out(from, label))
    }

    fn inbound(&self, to: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        Ok(self.state.read().expect("lock poisoned").inbound(to, label))
    }
}

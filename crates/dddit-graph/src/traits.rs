//! The [`GraphStore`] trait defining the graph storage interface.

use crate::error::GraphResult;
use crate::model::{EdgeLabel, Label, Properties, Vertex, VertexId};

/// Storage backend for the asset graph.
///
/// Every read is idempotent. The writes are `add_vertex`, `add_edge`,
/// `add_edge_if_vacant` and `remove_vertex`; each is a separate call with no
/// transaction spanning them.
pub trait GraphStore: Send + Sync {
    /// Create a vertex and return its id.
    fn add_vertex(&self, label: Label, properties: Properties) -> GraphResult<VertexId>;

    /// Create an edge. Both endpoints must exist.
    fn add_edge(&self, from: VertexId, label: EdgeLabel, to: VertexId) -> GraphResult<()>;

    /// Create an edge only if `from` has no outgoing edge with `label` yet.
    ///
    /// The check and the insert are atomic with respect to other writes on
    /// the same store. Returns `Ok(false)` when the slot was already taken.
    fn add_edge_if_vacant(
        &self,
        from: VertexId,
        label: EdgeLabel,
        to: VertexId,
    ) -> GraphResult<bool>;

    /// Remove a vertex and every edge touching it.
    ///
    /// Returns `Ok(false)` if the vertex did not exist.
    fn remove_vertex(&self, id: VertexId) -> GraphResult<bool>;

    /// Read a vertex.
    ///
    /// Returns `Err(GraphError::VertexNotFound)` if it does not exist.
    fn vertex(&self, id: VertexId) -> GraphResult<Vertex>;

    /// Ids of every vertex with `label` whose properties match all filters,
    /// in creation order.
    fn vertices(&self, label: Label, filters: &[(&str, &str)]) -> GraphResult<Vec<VertexId>>;

    /// Targets of outgoing edges with `label`, in edge creation order.
    fn out(&self, from: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>>;

    /// Sources of incoming edges with `label`, in edge creation order.
    fn inbound(&self, to: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>>;
}

impl<T: GraphStore + ?Sized> GraphStore for std::sync::Arc<T> {
    fn add_vertex(&self, label: Label, properties: Properties) -> GraphResult<VertexId> {
        (**self).add_vertex(label, properties)
    }

    fn add_edge(&self, from: VertexId, label: EdgeLabel, to: VertexId) -> GraphResult<()> {
        (**self).add_edge(from, label, to)
    }

    fn add_edge_if_vacant(
        &self,
        from: VertexId,
        label: EdgeLabel,
        to: VertexId,
    ) -> GraphResult<bool> {
        (**self).add_edge_if_vacant(from, label, to)
    }

    fn remove_vertex(&self, id: VertexId) -> GraphResult<bool> {
        (**self).remove_vertex(id)
    }

    fn vertex(&self, id: VertexId) -> GraphResult<Vertex> {
        (**self).vertex(id)
    }

    fn vertices(&self, label: Label, filters: &[(&str, &str)]) -> GraphResult<Vec<VertexId>> {
        (**self).vertices(label, filters)
    }

    fn out(&self, from: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        (**self).out(from, label)
    }

    fn inbound(&self, to: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        (**self).inbound(to, label)
    }
}

impl<T: GraphStore + ?Sized> GraphStore for &T {
    fn add_vertex(&self, label: Label, properties: Properties) -> GraphResult<VertexId> {
        (**self).add_vertex(label, properties)
    }

    fn add_edge(&self, from: VertexId, label: EdgeLabel, to: VertexId) -> GraphResult<()> {
        (**self).add_edge(from, label, to)
    }

    fn add_edge_if_vacant(
        &self,
        from: VertexId,
        label: EdgeLabel,
        to: VertexId,
    ) -> GraphResult<bool> {
        (**self).add_edge_if_vacant(from, label, to)
    }

    fn remove_vertex(&self, id: VertexId) -> GraphResult<bool> {
        (**self).remove_vertex(id)
    }

    fn vertex(&self, id: VertexId) -> GraphResult<Vertex> {
        (**self).vertex(id)
    }

    fn vertices(&self, label: Label, filters: &[(&str, &str)]) -> GraphResult<Vec<VertexId>> {
        (**self).vertices(label, filters)
    }

    fn out(&self, from: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        (**self).out(from, label)
    }

    fn inbound(&self, to: VertexId, label: EdgeLabel) -> GraphResult<Vec<VertexId>> {
        (**self).inbound(to, label)
    }
}

//! Compensation bookkeeping for multi-store commits.
//!
//! Each stage that writes something registers the matching undo step. On
//! failure the steps run newest first. Undo steps are best-effort: a failing
//! step is recorded and the unwind carries on with the rest.

use serde::{Deserialize, Serialize};
use tracing::debug;

use dddit_blob::BlobStore;
use dddit_graph::{GraphStore, VertexId};
use dddit_meta::{DocumentId, MetadataStore};

/// An undo step for one successful write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compensation {
    DeleteBlob { key: String },
    DeleteDocument { id: DocumentId },
    RemoveVertex { vertex: VertexId },
}

impl Compensation {
    fn apply(
        &self,
        blobs: &dyn BlobStore,
        metadata: &dyn MetadataStore,
        graph: &dyn GraphStore,
    ) -> Result<(), String> {
        match self {
            Self::DeleteBlob { key } => blobs.delete(key).map(drop).map_err(|e| e.to_string()),
            Self::DeleteDocument { id } => {
                metadata.delete_by_id(id).map(drop).map_err(|e| e.to_string())
            }
            Self::RemoveVertex { vertex } => {
                graph.remove_vertex(*vertex).map(drop).map_err(|e| e.to_string())
            }
        }
    }
}

/// Outcome of unwinding a [`Saga`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnwindReport {
    pub attempted: usize,
    /// Steps whose undo failed, with the failure message.
    pub failures: Vec<(Compensation, String)>,
}

impl UnwindReport {
    /// Returns `true` if every undo step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The compensation list of an in-flight commit.
#[derive(Clone, Debug, Default)]
pub struct Saga {
    steps: Vec<Compensation>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the undo step for a write that just succeeded.
    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Compensation] {
        &self.steps
    }

    /// Run every undo step, newest first.
    pub fn unwind(
        self,
        blobs: &dyn BlobStore,
        metadata: &dyn MetadataStore,
        graph: &dyn GraphStore,
    ) -> UnwindReport {
        let mut report = UnwindReport::default();
        for step in self.steps.into_iter().rev() {
            report.attempted += 1;
            if let Err(cause) = step.apply(blobs, metadata, graph) {
                debug!(?step, %cause, "compensation step failed");
                report.failures.push((step, cause));
            }
        }
        report
    }
}

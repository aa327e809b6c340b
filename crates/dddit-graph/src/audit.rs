//! Integrity checks over a branch's version chain.
//!
//! [`ChainAudit::inspect`] visits everything reachable from a branch's heads
//! and reports each place where the chain stops being a single linked list.
//! Unlike [`crate::query::walk_chain`] it never stops at the first problem.

use std::collections::{BTreeSet, HashSet};

use tracing::warn;

use dddit_types::BranchKey;

use crate::error::{GraphError, GraphResult};
use crate::model::{keys, EdgeLabel, VertexId};
use crate::query;
use crate::traits::GraphStore;

/// Result of auditing one branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainReport {
    pub branch: BranchKey,
    /// Number of distinct version vertices reachable from the branch.
    pub version_count: usize,
    pub violations: Vec<ChainViolation>,
}

impl ChainReport {
    /// Returns `true` if no violation was found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A single integrity violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainViolation {
    pub vertex: VertexId,
    pub kind: ChainViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainViolationKind {
    /// The branch has more than one HAS_VERSION edge.
    MultipleHeads,
    /// A version has more than one successor.
    Fork,
    /// A version has more than one predecessor.
    SharedPredecessor,
    /// Following successors leads back to an earlier version.
    Cycle,
}

/// Chain integrity auditor.
pub struct ChainAudit;

impl ChainAudit {
    /// Audit the chain of `branch`.
    ///
    /// Fails with [`GraphError::NotFound`] if the branch does not exist.
    pub fn inspect<G: GraphStore + ?Sized>(
        graph: &G,
        branch: &BranchKey,
    ) -> GraphResult<ChainReport> {
        let branch_id = query::find_branch(graph, branch)?
            .ok_or_else(|| GraphError::NotFound(branch.to_string()))?;
        let mut violations = Vec::new();

        let heads = graph.out(branch_id, EdgeLabel::HasVersion)?;
        if heads.len() > 1 {
            violations.push(ChainViolation {
                vertex: branch_id,
                kind: ChainViolationKind::MultipleHeads,
                description: format!("{} HAS_VERSION edges", heads.len()),
            });
        }

        let mut visited = BTreeSet::new();
        let mut shared_reported = HashSet::new();
        for head in heads {
            let mut path = HashSet::new();
            let mut stack = vec![(head, false)];
            while let Some((current, leaving)) = stack.pop() {
                if leaving {
                    path.remove(&current);
                    continue;
                }
                if !visited.insert(current) {
                    continue;
                }
                path.insert(current);
                stack.push((current, true));

                let successors = graph.out(current, EdgeLabel::HasNextVersion)?;
                if successors.len() > 1 {
                    violations.push(ChainViolation {
                        vertex: current,
                        kind: ChainViolationKind::Fork,
                        description: format!(
                            "{} has {} successors",
                            describe(graph, current),
                            successors.len()
                        ),
                    });
                }
                for next in successors {
                    let predecessors = graph.inbound(next, EdgeLabel::HasNextVersion)?;
                    if predecessors.len() > 1 && shared_reported.insert(next) {
                        violations.push(ChainViolation {
                            vertex: next,
                            kind: ChainViolationKind::SharedPredecessor,
                            description: format!(
                                "{} has {} predecessors",
                                describe(graph, next),
                                predecessors.len()
                            ),
                        });
                    }
                    if path.contains(&next) {
                        violations.push(ChainViolation {
                            vertex: current,
                            kind: ChainViolationKind::Cycle,
                            description: format!(
                                "{} links back to {}",
                                describe(graph, current),
                                describe(graph, next)
                            ),
                        });
                    } else {
                        stack.push((next, false));
                    }
                }
            }
        }

        for violation in &violations {
            warn!(branch = %branch, kind = ?violation.kind, "{}", violation.description);
        }

        Ok(ChainReport {
            branch: branch.clone(),
            version_count: visited.len(),
            violations,
        })
    }
}

fn describe<G: GraphStore + ?Sized>(graph: &G, id: VertexId) -> String {
    match graph.vertex(id) {
        Ok(v) => match v.get(keys::VERSION_NAME) {
            Some(name) => format!("{name} ({id})"),
            None => id.to_string(),
        },
        Err(_) => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::memory::InMemoryGraph;
    use crate::model::{Label, Properties};
    use dddit_types::ResourceKey;

    fn version(graph: &InMemoryGraph, name: &str) -> VertexId {
        let mut p = Properties::new();
        p.insert(keys::VERSION_NAME.into(), name.into());
        graph.add_vertex(Label::Version, p).unwrap()
    }

    fn setup() -> (Catalog<InMemoryGraph>, BranchKey, VertexId) {
        let catalog = Catalog::new(InMemoryGraph::new());
        catalog.create_user("alice").unwrap();
        catalog.create_repository("alice", "game").unwrap();
        let resource = ResourceKey::new("game", "charA");
        catalog.create_resource(&resource).unwrap();
        let key = resource.branch("main");
        let branch = catalog.create_branch(&key).unwrap();
        (catalog, key, branch)
    }

    #[test]
    fn linear_chain_is_valid() {
        let (catalog, key, branch) = setup();
        let graph = catalog.graph();
        let v1 = version(graph, "v1");
        let v2 = version(graph, "v2");
        graph.add_edge(branch, EdgeLabel::HasVersion, v1).unwrap();
        graph.add_edge(v1, EdgeLabel::HasNextVersion, v2).unwrap();

        let report = ChainAudit::inspect(graph, &key).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.version_count, 2);
    }

    #[test]
    fn empty_branch_is_valid() {
        let (catalog, key, _) = setup();
        let report = ChainAudit::inspect(catalog.graph(), &key).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.version_count, 0);
    }

    #[test]
    fn racing_appends_show_as_fork() {
        let (catalog, key, branch) = setup();
        let graph = catalog.graph();
        let v1 = version(graph, "v1");
        let a = version(graph, "v2a");
        let b = version(graph, "v2b");
        graph.add_edge(branch, EdgeLabel::HasVersion, v1).unwrap();
        graph.add_edge(v1, EdgeLabel::HasNextVersion, a).unwrap();
        graph.add_edge(v1, EdgeLabel::HasNextVersion, b).unwrap();

        let report = ChainAudit::inspect(graph, &key).unwrap();
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ChainViolationKind::Fork]);
        assert_eq!(report.violations[0].vertex, v1);
        assert_eq!(report.version_count, 3);
    }

    #[test]
    fn detects_heads_merges_and_cycles() {
        let (catalog, key, branch) = setup();
        let graph = catalog.graph();
        let v1 = version(graph, "v1");
        let v2 = version(graph, "v2");
        let x = version(graph, "x");
        graph.add_edge(branch, EdgeLabel::HasVersion, v1).unwrap();
        graph.add_edge(branch, EdgeLabel::HasVersion, x).unwrap();
        graph.add_edge(v1, EdgeLabel::HasNextVersion, v2).unwrap();
        graph.add_edge(x, EdgeLabel::HasNextVersion, v2).unwrap();
        graph.add_edge(v2, EdgeLabel::HasNextVersion, v1).unwrap();

        let report = ChainAudit::inspect(graph, &key).unwrap();
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
        assert!(kinds.contains(&ChainViolationKind::MultipleHeads));
        assert!(kinds.contains(&ChainViolationKind::SharedPredecessor));
        assert!(kinds.contains(&ChainViolationKind::Cycle));
        assert!(!report.is_valid());
    }

    #[test]
    fn missing_branch_is_not_found() {
        let (catalog, _, _) = setup();
        let err = ChainAudit::inspect(catalog.graph(), &BranchKey::new("game", "charA", "dev"))
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound(_)));
    }
}

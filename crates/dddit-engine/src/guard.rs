//! Precondition checks for a commit, run as a fail-fast pipeline.
//!
//! [`crate::VersionEngine::commit`] trusts its caller to have checked that
//! the branch exists, the version name is unused and the principal may
//! write. [`CommitGuard`] performs those checks for callers that do not.

use std::time::{Duration, Instant};

use tracing::debug;

use dddit_graph::{Catalog, GraphStore};
use dddit_types::VersionKey;

use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Request and decisions
// ---------------------------------------------------------------------------

/// What a guard evaluates.
#[derive(Clone, Copy, Debug)]
pub struct CommitRequest<'a> {
    /// The authenticated user committing.
    pub principal: &'a str,
    pub version: &'a VersionKey,
}

/// The outcome of a single stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    Pass,
    Fail { reason: String },
}

/// Recorded result of one stage.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    pub reason: Option<String>,
    pub elapsed: Duration,
}

/// The outcome of a full guard evaluation.
#[derive(Clone, Debug)]
pub struct GuardResult {
    /// First failure reason, if any stage failed.
    pub rejection: Option<String>,
    pub stage_results: Vec<StageResult>,
    pub elapsed: Duration,
}

impl GuardResult {
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// A single check in the guard pipeline.
pub trait GuardStage: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        request: &CommitRequest<'_>,
        graph: &dyn GraphStore,
    ) -> EngineResult<StageDecision>;
}

// ---------------------------------------------------------------------------
// Built-in stages
// ---------------------------------------------------------------------------

/// Every name in the version key is a valid path segment.
pub struct NamingStage;

impl GuardStage for NamingStage {
    fn name(&self) -> &str {
        "naming"
    }

    fn evaluate(
        &self,
        request: &CommitRequest<'_>,
        _graph: &dyn GraphStore,
    ) -> EngineResult<StageDecision> {
        Ok(match request.version.validate() {
            Ok(()) => StageDecision::Pass,
            Err(e) => StageDecision::Fail {
                reason: e.to_string(),
            },
        })
    }
}

/// The principal owns or contributes to the repository.
pub struct MembershipStage;

impl GuardStage for MembershipStage {
    fn name(&self) -> &str {
        "membership"
    }

    fn evaluate(
        &self,
        request: &CommitRequest<'_>,
        graph: &dyn GraphStore,
    ) -> EngineResult<StageDecision> {
        let catalog = Catalog::new(graph);
        let repository = &request.version.repository;
        if catalog.is_owner(request.principal, repository)?
            || catalog.is_contributor(request.principal, repository)?
        {
            return Ok(StageDecision::Pass);
        }
        Ok(StageDecision::Fail {
            reason: format!(
                "{} is neither owner nor contributor of {repository}",
                request.principal
            ),
        })
    }
}

/// The branch exists and the version name is unused on it.
pub struct PlacementStage;

impl GuardStage for PlacementStage {
    fn name(&self) -> &str {
        "placement"
    }

    fn evaluate(
        &self,
        request: &CommitRequest<'_>,
        graph: &dyn GraphStore,
    ) -> EngineResult<StageDecision> {
        let catalog = Catalog::new(graph);
        let branch = request.version.branch_key();
        if !catalog.branch_exists(&branch)? {
            return Ok(StageDecision::Fail {
                reason: format!("branch {branch} does not exist"),
            });
        }
        if catalog.version_exists(request.version)? {
            return Ok(StageDecision::Fail {
                reason: format!("version {} already exists", request.version),
            });
        }
        Ok(StageDecision::Pass)
    }
}

// ---------------------------------------------------------------------------
// CommitGuard
// ---------------------------------------------------------------------------

/// A configurable pipeline of [`GuardStage`]s.
pub struct CommitGuard {
    stages: Vec<Box<dyn GuardStage>>,
}

impl CommitGuard {
    /// An empty pipeline that accepts everything.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// naming -> membership -> placement
    pub fn with_default_stages() -> Self {
        let mut guard = Self::new();
        guard.add_stage(Box::new(NamingStage));
        guard.add_stage(Box::new(MembershipStage));
        guard.add_stage(Box::new(PlacementStage));
        guard
    }

    pub fn add_stage(&mut self, stage: Box<dyn GuardStage>) {
        self.stages.push(stage);
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Run the stages in order, stopping at the first failure.
    pub fn evaluate(
        &self,
        request: &CommitRequest<'_>,
        graph: &dyn GraphStore,
    ) -> EngineResult<GuardResult> {
        let started = Instant::now();
        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(request, graph)?;
            let reason = match &decision {
                StageDecision::Pass => None,
                StageDecision::Fail { reason } => Some(reason.clone()),
            };
            stage_results.push(StageResult {
                stage_name: stage.name().to_string(),
                passed: reason.is_none(),
                reason: reason.clone(),
                elapsed: stage_start.elapsed(),
            });

            if let Some(reason) = reason {
                debug!(stage = stage.name(), %reason, "commit guard rejected");
                return Ok(GuardResult {
                    rejection: Some(reason),
                    stage_results,
                    elapsed: started.elapsed(),
                });
            }
        }

        Ok(GuardResult {
            rejection: None,
            stage_results,
            elapsed: started.elapsed(),
        })
    }
}

impl Default for CommitGuard {
    fn default() -> Self {
        Self::with_default_stages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dddit_graph::InMemoryGraph;
    use dddit_types::ResourceKey;

    fn graph() -> InMemoryGraph {
        let catalog = Catalog::new(InMemoryGraph::new());
        catalog.create_user("alice").unwrap();
        catalog.create_user("bob").unwrap();
        catalog.create_user("eve").unwrap();
        catalog.create_repository("alice", "game").unwrap();
        catalog.add_contributor("game", "bob").unwrap();
        let resource = ResourceKey::new("game", "charA");
        catalog.create_resource(&resource).unwrap();
        catalog.create_branch(&resource.branch("main")).unwrap();
        catalog.into_graph()
    }

    fn run(principal: &str, version: &VersionKey, graph: &InMemoryGraph) -> GuardResult {
        CommitGuard::with_default_stages()
            .evaluate(&CommitRequest { principal, version }, graph)
            .unwrap()
    }

    #[test]
    fn owner_and_contributor_pass() {
        let graph = graph();
        let key = VersionKey::new("game", "charA", "main", "v1");
        let result = run("alice", &key, &graph);
        assert!(result.is_accepted());
        assert_eq!(result.stage_results.len(), 3);
        assert!(run("bob", &key, &graph).is_accepted());
    }

    #[test]
    fn outsider_stops_at_membership() {
        let graph = graph();
        let result = run("eve", &VersionKey::new("game", "charA", "main", "v1"), &graph);
        assert!(!result.is_accepted());
        assert_eq!(result.stage_results.len(), 2);
        assert_eq!(result.stage_results[1].stage_name, "membership");
        assert!(result.rejection.unwrap().contains("eve"));
    }

    #[test]
    fn bad_name_fails_first() {
        let graph = graph();
        let result = run("alice", &VersionKey::new("game", "charA", "main", "v/1"), &graph);
        assert_eq!(result.stage_results.len(), 1);
        assert_eq!(result.stage_results[0].stage_name, "naming");
    }

    #[test]
    fn missing_branch_fails_placement() {
        let graph = graph();
        let result = run("alice", &VersionKey::new("game", "charA", "dev", "v1"), &graph);
        assert!(result.rejection.unwrap().contains("does not exist"));
    }

    #[test]
    fn empty_guard_accepts() {
        let graph = graph();
        let key = VersionKey::new("x", "y", "z", "w");
        let result = CommitGuard::new()
            .evaluate(&CommitRequest { principal: "nobody", version: &key }, &graph)
            .unwrap();
        assert!(result.is_accepted());
        assert!(result.stage_results.is_empty());
    }
}

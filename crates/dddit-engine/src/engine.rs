//! The version-chain commit engine.
//!
//! # Commit protocol
//!
//! | Stage | Write                               | Undo registered        |
//! |-------|-------------------------------------|------------------------|
//! | BLOB  | every payload file                  | delete each blob       |
//! | METADATA | document holding the blob locator | delete the document  |
//! | GRAPH | version vertex, then the tail edge  | remove the vertex      |
//!
//! A missing branch fails as `BRANCH_NOT_FOUND` after the first two stages.
//! The tail edge is created with [`GraphStore::add_edge_if_vacant`], so two
//! writers appending to the same branch can never both claim one tail; the
//! loser re-reads the tail and tries again up to `append.max_attempts` times.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use dddit_blob::{folder_prefix, object_key, BlobStore};
use dddit_graph::{query, ChainAudit, ChainReport, EdgeLabel, GraphStore, Label, VertexId};
use dddit_meta::{DocumentId, MetaError, MetadataDocument, MetadataStore};
use dddit_types::{BranchKey, LocatorScheme, NewVersion, ResourceType, VersionKey, VersionRecord};

use crate::config::EngineConfig;
use crate::error::{CommitStage, EngineError, EngineResult};
use crate::guard::{CommitGuard, CommitRequest};
use crate::journal::{CommitId, IntentJournal, IntentRecord};
use crate::payload::{Payload, ResolvedFile, ResolvedVersion};
use crate::saga::{Compensation, Saga};

/// Wall-clock time spent in one commit stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: CommitStage,
    pub elapsed: Duration,
}

/// What a successful commit produced.
#[derive(Clone, Debug)]
pub struct CommitReceipt {
    pub commit: CommitId,
    pub version: VersionKey,
    pub vertex: VertexId,
    pub metadata_locator: String,
    pub blob_locator: String,
    /// Conditional link attempts needed to claim the chain tail.
    pub append_attempts: u32,
    pub timings: Vec<StageTiming>,
}

impl CommitReceipt {
    /// The locator the version vertex carries; it leads to the version's
    /// metadata and from there to its payload.
    pub fn version_locator(&self) -> &str {
        &self.metadata_locator
    }
}

/// Descriptive fields of a version, without its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionDetails {
    pub record: VersionRecord,
    pub document: MetadataDocument,
}

/// Outcome of [`VersionEngine::sweep_orphans`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending intents looked at.
    pub examined: usize,
    /// Intents whose version turned out to be linked; marked completed.
    pub completed: usize,
    /// Intents whose leftovers were removed.
    pub compensated: usize,
    /// Intents that still could not be cleaned up.
    pub dirty: usize,
}

/// Commits, resolves and lists versions across the three stores.
///
/// Store handles are created once by the caller and owned by the engine for
/// its lifetime; pass `Arc`s to share them.
pub struct VersionEngine<B, M, G> {
    blobs: B,
    metadata: M,
    graph: G,
    config: EngineConfig,
    blob_scheme: LocatorScheme,
    metadata_scheme: LocatorScheme,
    journal: Option<IntentJournal>,
    guard: CommitGuard,
}

impl<B: BlobStore, M: MetadataStore, G: GraphStore> VersionEngine<B, M, G> {
    /// Build an engine. Opens the intent journal if the config names one.
    pub fn new(blobs: B, metadata: M, graph: G, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let journal = match &config.journal.path {
            Some(path) => Some(IntentJournal::open(path)?),
            None => None,
        };
        Ok(Self {
            blob_scheme: config.blob_scheme(),
            metadata_scheme: config.metadata_scheme(),
            blobs,
            metadata,
            graph,
            config,
            journal,
            guard: CommitGuard::with_default_stages(),
        })
    }

    pub fn with_journal(mut self, journal: IntentJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Replace the guard used by [`Self::commit_as`].
    pub fn with_guard(mut self, guard: CommitGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn journal(&self) -> Option<&IntentJournal> {
        self.journal.as_ref()
    }

    // ---------------------------------------------------------------
    // Commit
    // ---------------------------------------------------------------

    /// Commit a new version as the tail of its branch.
    ///
    /// The caller vouches that the branch exists, that the version name is
    /// unused, and that the author may write; see [`Self::commit_as`] for the
    /// checked variant. On failure every write already made is undone on a
    /// best-effort basis and the error names the failing stage.
    pub fn commit(&self, version: NewVersion, payload: Payload) -> EngineResult<CommitReceipt> {
        version
            .key
            .validate()
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        payload.check()?;

        let key = version.key.clone();
        let branch_key = key.branch_key();
        let resource_type = payload.resource_type();
        let bucket = self.bucket_for(resource_type).to_string();
        let blob_keys: Vec<String> = payload
            .files()
            .iter()
            .map(|f| object_key(&bucket, &key, &f.filename))
            .collect();

        let commit = CommitId::generate();
        if let Some(journal) = &self.journal {
            journal.append(&IntentRecord::Begin {
                commit,
                version: key.clone(),
                blob_keys: blob_keys.clone(),
            })?;
        }
        let mut saga = Saga::new();
        let mut timings = Vec::with_capacity(3);

        // Stage 1: payload.
        let started = Instant::now();
        for (file, blob_key) in payload.into_files().into_iter().zip(&blob_keys) {
            let mut reader = file.reader;
            if let Err(e) = self
                .blobs
                .put(blob_key, &mut reader, file.size, &file.content_type)
            {
                return Err(self.abort(commit, CommitStage::Blob, e, saga));
            }
            saga.record(Compensation::DeleteBlob {
                key: blob_key.clone(),
            });
        }
        let blob_locator = match resource_type {
            ResourceType::Mesh => self.blob_scheme.compose(&blob_keys[0]),
            ResourceType::Material => self.blob_scheme.compose(&folder_prefix(&bucket, &key)),
        };
        timings.push(StageTiming {
            stage: CommitStage::Blob,
            elapsed: started.elapsed(),
        });
        debug!(%commit, %blob_locator, files = blob_keys.len(), "payload stored");

        // Stage 2: metadata document.
        let started = Instant::now();
        let mut record = version.into_record(resource_type, String::new(), Utc::now());
        let document = MetadataDocument::for_version(&key, &record, blob_locator.clone());
        let document_id = match self.metadata.insert(&document) {
            Ok(id) => id,
            Err(e) => return Err(self.abort(commit, CommitStage::Metadata, e, saga)),
        };
        saga.record(Compensation::DeleteDocument {
            id: document_id.clone(),
        });
        self.note(IntentRecord::MetadataWritten {
            commit,
            document: document_id.clone(),
        });
        record.metadata_locator = self.metadata_scheme.compose(document_id.as_str());
        timings.push(StageTiming {
            stage: CommitStage::Metadata,
            elapsed: started.elapsed(),
        });
        debug!(%commit, metadata_locator = %record.metadata_locator, "metadata stored");

        // Stage 3: graph.
        let started = Instant::now();
        let branch = match query::find_branch(&self.graph, &branch_key) {
            Ok(Some(branch)) => branch,
            Ok(None) => {
                let cause = format!("branch {branch_key} not found");
                return Err(self.abort(commit, CommitStage::BranchNotFound, cause, saga));
            }
            Err(e) => return Err(self.abort(commit, CommitStage::Graph, e, saga)),
        };
        let vertex = match self
            .graph
            .add_vertex(Label::Version, query::version_properties(&record))
        {
            Ok(vertex) => vertex,
            Err(e) => return Err(self.abort(commit, CommitStage::Graph, e, saga)),
        };
        saga.record(Compensation::RemoveVertex { vertex });
        self.note(IntentRecord::VertexCreated { commit, vertex });

        let append_attempts = match self.link_as_tail(branch, &branch_key, vertex) {
            Ok(attempts) => attempts,
            Err(cause) => return Err(self.abort(commit, CommitStage::Graph, cause, saga)),
        };
        timings.push(StageTiming {
            stage: CommitStage::Graph,
            elapsed: started.elapsed(),
        });
        self.note(IntentRecord::Completed { commit });

        info!(version = %key, %commit, %vertex, append_attempts, "committed version");
        Ok(CommitReceipt {
            commit,
            version: key,
            vertex,
            metadata_locator: record.metadata_locator,
            blob_locator,
            append_attempts,
            timings,
        })
    }

    /// Check preconditions with the commit guard, then commit.
    ///
    /// A rejection is [`EngineError::Validation`] and writes nothing. The
    /// principal becomes the author unless the version names one.
    pub fn commit_as(
        &self,
        principal: &str,
        mut version: NewVersion,
        payload: Payload,
    ) -> EngineResult<CommitReceipt> {
        let request = CommitRequest {
            principal,
            version: &version.key,
        };
        let verdict = self.guard.evaluate(&request, &self.graph)?;
        if let Some(reason) = verdict.rejection {
            return Err(EngineError::Validation(reason));
        }
        if version.username.is_none() {
            version.username = Some(principal.to_string());
        }
        self.commit(version, payload)
    }

    /// Link `vertex` after the current tail, retrying when another writer
    /// claims the tail first. Returns the number of attempts used.
    fn link_as_tail(
        &self,
        branch: VertexId,
        key: &BranchKey,
        vertex: VertexId,
    ) -> Result<u32, String> {
        let max_attempts = self.config.append.max_attempts;
        for attempt in 1..=max_attempts {
            let tail = query::chain_tail(&self.graph, branch, key).map_err(|e| e.to_string())?;
            let linked = match tail {
                None => self
                    .graph
                    .add_edge_if_vacant(branch, EdgeLabel::HasVersion, vertex),
                Some(tail) => self
                    .graph
                    .add_edge_if_vacant(tail, EdgeLabel::HasNextVersion, vertex),
            }
            .map_err(|e| e.to_string())?;
            if linked {
                return Ok(attempt);
            }
            debug!(branch = %key, attempt, "chain tail moved; retrying");
        }
        Err(format!(
            "chain tail kept moving after {max_attempts} attempts"
        ))
    }

    fn abort(
        &self,
        commit: CommitId,
        stage: CommitStage,
        cause: impl fmt::Display,
        saga: Saga,
    ) -> EngineError {
        let cause = cause.to_string();
        warn!(%commit, %stage, %cause, steps = saga.len(), "commit failed; compensating");
        let report = saga.unwind(&self.blobs, &self.metadata, &self.graph);
        if !report.is_clean() {
            debug!(%commit, failed = report.failures.len(), "compensation incomplete");
        }
        self.note(IntentRecord::Compensated {
            commit,
            clean: report.is_clean(),
        });
        EngineError::Commit { stage, cause }
    }

    /// Journal a step after `Begin`. A lost record only weakens crash
    /// recovery, so it is logged rather than failing the commit.
    fn note(&self, record: IntentRecord) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(&record) {
                warn!(commit = %record.commit(), error = %e, "failed to journal commit step");
            }
        }
    }

    fn bucket_for(&self, resource_type: ResourceType) -> &str {
        match resource_type {
            ResourceType::Mesh => &self.config.blob.meshes_bucket,
            ResourceType::Material => &self.config.blob.materials_bucket,
        }
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Version names on a branch, oldest first.
    pub fn list_chain(&self, branch: &BranchKey) -> EngineResult<Vec<String>> {
        Ok(query::list_chain(&self.graph, branch)?)
    }

    pub fn version_exists(&self, key: &VersionKey) -> EngineResult<bool> {
        Ok(query::find_version(&self.graph, key)?.is_some())
    }

    /// Read a version's descriptive fields. Does not touch the blob store.
    pub fn find_metadata(&self, key: &VersionKey) -> EngineResult<VersionDetails> {
        let vertex = query::find_version(&self.graph, key)?
            .ok_or_else(|| EngineError::NotFound(format!("version {key}")))?;
        let record = query::read_version(&self.graph, vertex)?;
        let id = self.document_id(&record.metadata_locator)?;
        let document = self
            .metadata
            .find_by_id(&id)?
            .ok_or_else(|| EngineError::NotFound(format!("metadata document of {key}")))?;
        Ok(VersionDetails { record, document })
    }

    /// Open a version's payload.
    ///
    /// A mesh yields one file. A material yields every object under its
    /// folder in store listing order.
    pub fn resolve(&self, key: &VersionKey) -> EngineResult<ResolvedVersion> {
        let VersionDetails { record, document } = self.find_metadata(key)?;
        let local = self
            .blob_scheme
            .strip(&document.blob_locator)
            .map_err(|e| EngineError::unavailable("blob", e))?;

        let files = match record.resource_type {
            ResourceType::Mesh => vec![ResolvedFile::from(self.blobs.get(local)?)],
            ResourceType::Material => {
                let keys = self.blobs.list_by_prefix(local)?;
                if keys.is_empty() {
                    return Err(EngineError::NotFound(format!("payload of {key}")));
                }
                keys.iter()
                    .map(|k| Ok(ResolvedFile::from(self.blobs.get(k)?)))
                    .collect::<EngineResult<Vec<_>>>()?
            }
        };
        debug!(version = %key, files = files.len(), "resolved version");
        Ok(ResolvedVersion {
            record,
            document,
            files,
        })
    }

    /// Audit a branch's chain for forks, cycles and extra heads.
    pub fn audit(&self, branch: &BranchKey) -> EngineResult<ChainReport> {
        Ok(ChainAudit::inspect(&self.graph, branch)?)
    }

    fn document_id(&self, locator: &str) -> EngineResult<DocumentId> {
        let local = self
            .metadata_scheme
            .strip(locator)
            .map_err(|e| EngineError::unavailable("metadata", e))?;
        local
            .parse()
            .map_err(|e: MetaError| EngineError::unavailable("metadata", e))
    }

    // ---------------------------------------------------------------
    // Recovery
    // ---------------------------------------------------------------

    /// Clean up after commits the journal shows as unfinished.
    ///
    /// An intent whose vertex is linked into a chain actually landed and is
    /// marked completed. Otherwise its document and vertex are removed, and
    /// its blobs too unless another commit has since claimed the same
    /// version. Run this while no commits are in flight. Without a journal
    /// there is nothing to sweep.
    pub fn sweep_orphans(&self) -> EngineResult<SweepReport> {
        let Some(journal) = &self.journal else {
            return Ok(SweepReport::default());
        };
        let mut report = SweepReport::default();

        for intent in journal.pending()? {
            report.examined += 1;
            let landed = match intent.vertex {
                Some(vertex) => self.is_linked(vertex)?,
                None => false,
            };
            if landed {
                journal.append(&IntentRecord::Completed {
                    commit: intent.commit,
                })?;
                report.completed += 1;
                info!(commit = %intent.commit, version = %intent.version, "intent had landed");
                continue;
            }

            let mut saga = Saga::new();
            if query::find_version(&self.graph, &intent.version)?.is_none() {
                for key in &intent.blob_keys {
                    saga.record(Compensation::DeleteBlob { key: key.clone() });
                }
            }
            if let Some(id) = &intent.document {
                saga.record(Compensation::DeleteDocument { id: id.clone() });
            }
            if let Some(vertex) = intent.vertex {
                saga.record(Compensation::RemoveVertex { vertex });
            }
            let outcome = saga.unwind(&self.blobs, &self.metadata, &self.graph);
            journal.append(&IntentRecord::Compensated {
                commit: intent.commit,
                clean: outcome.is_clean(),
            })?;
            if outcome.is_clean() {
                report.compensated += 1;
                info!(commit = %intent.commit, version = %intent.version, "swept orphaned writes");
            } else {
                report.dirty += 1;
                warn!(
                    commit = %intent.commit,
                    failures = outcome.failures.len(),
                    "orphaned writes remain"
                );
            }
        }

        journal.compact()?;
        Ok(report)
    }

    fn is_linked(&self, vertex: VertexId) -> EngineResult<bool> {
        Ok(!self.graph.inbound(vertex, EdgeLabel::HasVersion)?.is_empty()
            || !self.graph.inbound(vertex, EdgeLabel::HasNextVersion)?.is_empty())
    }
}

//! Version-chain commit engine for dddit.
//!
//! A commit spans three independent stores with no shared transaction:
//!
//! 1. the payload goes to the blob store,
//! 2. a metadata document pointing at the payload goes to the document store,
//! 3. a version vertex pointing at the document is linked as the new tail of
//!    the branch chain in the graph store.
//!
//! [`VersionEngine`] runs these stages as a saga. Every successful write
//! registers a [`Compensation`]; on failure the list is unwound in reverse.
//! An optional [`IntentJournal`] records each step durably so that leftovers
//! of a crashed process can be swept later.
//!
//! # Modules
//!
//! - [`error`]: [`EngineError`] and [`CommitStage`]
//! - [`config`]: [`EngineConfig`], loadable from TOML
//! - [`payload`]: Mesh and material payloads, resolved files
//! - [`saga`]: Compensation list and unwinding
//! - [`journal`]: CRC-framed write-ahead intent log
//! - [`guard`]: Fail-fast precondition pipeline for [`VersionEngine::commit_as`]
//! - [`engine`]: [`VersionEngine`] itself

pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod journal;
pub mod payload;
pub mod saga;

#[cfg(test)]
mod testing;

pub use config::{AppendConfig, BlobConfig, EngineConfig, JournalConfig, MetadataConfig};
pub use engine::{CommitReceipt, StageTiming, SweepReport, VersionDetails, VersionEngine};
pub use error::{CommitStage, EngineError, EngineResult};
pub use guard::{
    CommitGuard, CommitRequest, GuardResult, GuardStage, MembershipStage, NamingStage,
    PlacementStage, StageDecision, StageResult,
};
pub use journal::{CommitId, IntentJournal, IntentRecord, PendingIntent};
pub use payload::{Payload, PayloadFile, ResolvedFile, ResolvedVersion};
pub use saga::{Compensation, Saga, UnwindReport};

//! Layout of a dddit home directory.
//!
//! ```text
//! dddit.toml     engine configuration (optional)
//! blobs/         FsBlobStore
//! metadata/      FsMetadataStore
//! graph.json     FileGraphStore snapshot
//! intents.log    intent journal, unless the configuration names another
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use dddit_blob::FsBlobStore;
use dddit_engine::{EngineConfig, VersionEngine};
use dddit_graph::{Catalog, FileGraphStore};
use dddit_meta::FsMetadataStore;

pub const CONFIG_FILE: &str = "dddit.toml";
const BLOBS_DIR: &str = "blobs";
const METADATA_DIR: &str = "metadata";
const GRAPH_FILE: &str = "graph.json";
const JOURNAL_FILE: &str = "intents.log";

pub type Engine = VersionEngine<FsBlobStore, FsMetadataStore, FileGraphStore>;

pub struct Home {
    root: PathBuf,
}

impl Home {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.config_path().is_file()
    }

    /// Load the configuration, defaulting the journal to `intents.log`.
    pub fn config(&self) -> anyhow::Result<EngineConfig> {
        let path = self.config_path();
        let mut config = if path.is_file() {
            EngineConfig::load(&path)
                .with_context(|| format!("reading {}", path.display()))?
        } else {
            EngineConfig::default()
        };
        if config.journal.path.is_none() {
            config.journal.path = Some(self.root.join(JOURNAL_FILE));
        }
        Ok(config)
    }

    pub fn graph(&self) -> anyhow::Result<FileGraphStore> {
        let path = self.root.join(GRAPH_FILE);
        FileGraphStore::open(&path).with_context(|| format!("opening {}", path.display()))
    }

    pub fn catalog(&self) -> anyhow::Result<Catalog<FileGraphStore>> {
        Ok(Catalog::new(self.graph()?))
    }

    pub fn engine(&self) -> anyhow::Result<Engine> {
        let blobs = FsBlobStore::open(self.root.join(BLOBS_DIR))
            .context("opening blob store")?;
        let metadata = FsMetadataStore::open(self.root.join(METADATA_DIR))
            .context("opening metadata store")?;
        let graph = self.graph()?;
        let config = self.config()?;
        debug!(home = %self.root.display(), "opened stores");
        Ok(VersionEngine::new(blobs, metadata, graph, config)?)
    }
}

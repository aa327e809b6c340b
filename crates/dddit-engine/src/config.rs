//! Engine configuration.
//!
//! Every section and key is optional in TOML; missing values fall back to
//! the defaults below.
//!
//! ```toml
//! [blob]
//! endpoint = "blob://local"
//! meshes_bucket = "meshes"
//! materials_bucket = "materials"
//!
//! [metadata]
//! locator_prefix = "docdb://local/dddit/versions"
//!
//! [append]
//! max_attempts = 3
//!
//! [journal]
//! path = ".dddit/intents.log"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dddit_types::{validate_name, LocatorScheme, NameKind};

use crate::error::{EngineError, EngineResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub blob: BlobConfig,
    pub metadata: MetadataConfig,
    pub append: AppendConfig,
    pub journal: JournalConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Prefix of every blob locator.
    pub endpoint: String,
    pub meshes_bucket: String,
    pub materials_bucket: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            endpoint: "blob://local".into(),
            meshes_bucket: "meshes".into(),
            materials_bucket: "materials".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Prefix of every metadata locator; the document id follows it.
    pub locator_prefix: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            locator_prefix: "docdb://local/dddit/versions".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppendConfig {
    /// How many times a commit re-reads the chain tail after losing a race.
    pub max_attempts: u32,
}

impl Default for AppendConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Intent journal file. Journaling is off when unset.
    pub path: Option<PathBuf>,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.append.max_attempts == 0 {
            return Err(EngineError::Config("append.max_attempts must be at least 1".into()));
        }
        for bucket in [&self.blob.meshes_bucket, &self.blob.materials_bucket] {
            validate_name(NameKind::File, bucket)
                .map_err(|e| EngineError::Config(format!("bucket: {e}")))?;
        }
        if self.blob.meshes_bucket == self.blob.materials_bucket {
            return Err(EngineError::Config(
                "meshes and materials buckets must differ".into(),
            ));
        }
        if self.blob.endpoint.trim_end_matches('/').is_empty() {
            return Err(EngineError::Config("blob.endpoint must not be empty".into()));
        }
        if self.metadata.locator_prefix.trim_end_matches('/').is_empty() {
            return Err(EngineError::Config(
                "metadata.locator_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn blob_scheme(&self) -> LocatorScheme {
        LocatorScheme::new(self.blob.endpoint.clone())
    }

    pub fn metadata_scheme(&self) -> LocatorScheme {
        LocatorScheme::new(self.metadata.locator_prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.blob.endpoint, "blob://local");
        assert_eq!(c.blob.meshes_bucket, "meshes");
        assert_eq!(c.blob.materials_bucket, "materials");
        assert_eq!(c.metadata.locator_prefix, "docdb://local/dddit/versions");
        assert_eq!(c.append.max_attempts, 3);
        assert!(c.journal.path.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = EngineConfig::from_toml_str(
            r#"
            [blob]
            endpoint = "https://assets.example.com"

            [journal]
            path = "/var/lib/dddit/intents.log"
            "#,
        )
        .unwrap();
        assert_eq!(c.blob.endpoint, "https://assets.example.com");
        assert_eq!(c.blob.meshes_bucket, "meshes");
        assert_eq!(c.append.max_attempts, 3);
        assert_eq!(
            c.journal.path,
            Some(PathBuf::from("/var/lib/dddit/intents.log"))
        );
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EngineConfig::from_toml_str("[append]\nmax_attempts = 0").is_err());
        assert!(EngineConfig::from_toml_str("[blob]\nmeshes_bucket = \"a/b\"").is_err());
        assert!(EngineConfig::from_toml_str("[blob]\nmaterials_bucket = \"meshes\"").is_err());
        assert!(matches!(
            EngineConfig::from_toml_str("[append]\nmax_attempts = \"many\"").unwrap_err(),
            EngineError::Config(_)
        ));
    }

    #[test]
    fn toml_roundtrip_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dddit.toml");
        let mut config = EngineConfig::default();
        config.append.max_attempts = 5;
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
        assert!(EngineConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn schemes_follow_config() {
        let c = EngineConfig::default();
        assert_eq!(c.blob_scheme().compose("meshes/a"), "blob://local/meshes/a");
        assert_eq!(
            c.metadata_scheme().compose("id-1"),
            "docdb://local/dddit/versions/id-1"
        );
    }
}

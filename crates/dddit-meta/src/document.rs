//! Metadata documents and their identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dddit_types::{VersionKey, VersionRecord};

use crate::error::MetaError;

/// Generated identifier of a metadata document.
///
/// Ids are UUID v7 strings, so they sort roughly by creation time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = MetaError;

    /// Parse an id, accepting only well-formed UUIDs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(|uuid| Self(uuid.to_string()))
            .map_err(|_| MetaError::InvalidId(s.to_string()))
    }
}

/// Descriptive fields of one version, plus the locator of its payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    pub repository_name: String,
    pub resource_name: String,
    pub branch_name: String,
    pub version_name: String,
    pub username: String,
    pub pushed_at: DateTime<Utc>,
    pub comment: String,
    pub tags: Vec<String>,
    pub blob_locator: String,
}

impl MetadataDocument {
    /// Build the document for a version record and its payload locator.
    pub fn for_version(key: &VersionKey, record: &VersionRecord, blob_locator: String) -> Self {
        Self {
            repository_name: key.repository.clone(),
            resource_name: key.resource.clone(),
            branch_name: key.branch.clone(),
            version_name: key.version.clone(),
            username: record.username.clone(),
            pushed_at: record.pushed_at,
            comment: record.comment.clone(),
            tags: record.tags.clone(),
            blob_locator,
        }
    }

    /// The version this document describes.
    pub fn version_key(&self) -> VersionKey {
        VersionKey::new(
            self.repository_name.clone(),
            self.resource_name.clone(),
            self.branch_name.clone(),
            self.version_name.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dddit_types::ResourceType;

    #[test]
    fn generated_ids_parse_back() {
        let id = DocumentId::generate();
        let parsed: DocumentId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<DocumentId>().is_err());
    }

    #[test]
    fn document_uses_camel_case_fields() {
        let key = VersionKey::new("game", "charA", "main", "v1");
        let record = VersionRecord {
            name: "v1".into(),
            resource_type: ResourceType::Mesh,
            metadata_locator: String::new(),
            pushed_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            username: "alice".into(),
            comment: "block-out".into(),
            tags: vec!["wip".into()],
        };
        let doc = MetadataDocument::for_version(&key, &record, "blob://local/meshes/x".into());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["resourceName"], "charA");
        assert_eq!(json["blobLocator"], "blob://local/meshes/x");
        assert_eq!(doc.version_key(), key);
    }
}

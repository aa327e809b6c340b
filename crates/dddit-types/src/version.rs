use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::VersionKey;
use crate::resource::ResourceType;

/// Username recorded when the caller supplies none.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Descriptive input for a version about to be committed.
///
/// Optional fields are filled at commit time: a missing username becomes
/// [`ANONYMOUS_USER`], a missing timestamp becomes the commit time, a missing
/// comment becomes empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVersion {
    pub key: VersionKey,
    pub username: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub tags: Vec<String>,
}

impl NewVersion {
    pub fn new(key: VersionKey) -> Self {
        Self {
            key,
            username: None,
            pushed_at: None,
            comment: None,
            tags: Vec::new(),
        }
    }

    pub fn by(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn at(mut self, pushed_at: DateTime<Utc>) -> Self {
        self.pushed_at = Some(pushed_at);
        self
    }

    /// Fill defaults, producing the record stored alongside the version.
    pub fn into_record(
        self,
        resource_type: ResourceType,
        metadata_locator: String,
        now: DateTime<Utc>,
    ) -> VersionRecord {
        VersionRecord {
            name: self.key.version,
            resource_type,
            metadata_locator,
            pushed_at: self.pushed_at.unwrap_or(now),
            username: self
                .username
                .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            comment: self.comment.unwrap_or_default(),
            tags: self.tags,
        }
    }
}

/// The fields a committed version carries in the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    pub resource_type: ResourceType,
    pub metadata_locator: String,
    pub pushed_at: DateTime<Utc>,
    pub username: String,
    pub comment: String,
    pub tags: Vec<String>,
}

/// Render a timestamp the way it is stored in graph properties.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))
}

/// Encode tags as a single property value (a JSON array).
pub fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Decode tags written by [`encode_tags`].
pub fn decode_tags(s: &str) -> Result<Vec<String>, TypeError> {
    serde_json::from_str(s).map_err(|e| TypeError::Serialization(e.to_string()))
}

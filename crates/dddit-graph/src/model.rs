//! Vertex and edge vocabulary of the asset graph.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a vertex, assigned by the store on creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Vertex labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    User,
    Repository,
    Resource,
    Branch,
    Version,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Repository => "repository",
            Self::Resource => "resource",
            Self::Branch => "branch",
            Self::Version => "version",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeLabel {
    /// User → Repository, exactly one per repository.
    Owns,
    /// User → Repository.
    ContributesTo,
    /// Repository → Resource.
    Contains,
    /// Resource → Branch.
    HasBranch,
    /// Branch → head version.
    HasVersion,
    /// Predecessor version → successor version.
    HasNextVersion,
}

impl EdgeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owns => "OWNS",
            Self::ContributesTo => "CONTRIBUTES_TO",
            Self::Contains => "CONTAINS",
            Self::HasBranch => "HAS_BRANCH",
            Self::HasVersion => "HAS_VERSION",
            Self::HasNextVersion => "HAS_NEXT_VERSION",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String-valued vertex properties.
pub type Properties = BTreeMap<String, String>;

/// Property keys used on vertices.
pub mod keys {
    pub const USERNAME: &str = "username";
    pub const REPOSITORY_NAME: &str = "repositoryName";
    pub const RESOURCE_NAME: &str = "resourceName";
    pub const BRANCH_NAME: &str = "branchName";
    pub const VERSION_NAME: &str = "versionName";
    pub const RESOURCE_TYPE: &str = "resourceType";
    pub const METADATA_LOCATOR: &str = "metadataLocator";
    pub const PUSHED_AT: &str = "pushedAt";
    pub const COMMENT: &str = "comment";
    pub const TAGS: &str = "tags";
}

/// A labelled vertex with its properties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub label: Label,
    pub properties: Properties,
}

impl Vertex {
    /// Look up a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns `true` if every `(key, value)` filter matches.
    pub fn matches(&self, filters: &[(&str, &str)]) -> bool {
        filters.iter().all(|(k, v)| self.get(k) == Some(*v))
    }
}

/// A directed, labelled edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: VertexId,
    pub label: EdgeLabel,
    pub to: VertexId,
}

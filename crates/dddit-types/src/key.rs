//! Coordinates that address resources, branches and versions.
//!
//! A version is identified by `(repository, resource, branch, version)`. The
//! textual form is `repository/resource/branch@version`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::names::{validate_name, NameKind};

/// A resource inside a repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub repository: String,
    pub resource: String,
}

impl ResourceKey {
    pub fn new(repository: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            resource: resource.into(),
        }
    }

    /// The branch with the given name on this resource.
    pub fn branch(&self, branch: impl Into<String>) -> BranchKey {
        BranchKey {
            repository: self.repository.clone(),
            resource: self.resource.clone(),
            branch: branch.into(),
        }
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        validate_name(NameKind::Repository, &self.repository)?;
        validate_name(NameKind::Resource, &self.resource)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.repository, self.resource)
    }
}

/// A branch of a resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchKey {
    pub repository: String,
    pub resource: String,
    pub branch: String,
}

impl BranchKey {
    pub fn new(
        repository: impl Into<String>,
        resource: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            resource: resource.into(),
            branch: branch.into(),
        }
    }

    /// The resource this branch belongs to.
    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey::new(self.repository.clone(), self.resource.clone())
    }

    /// The version with the given name on this branch.
    pub fn version(&self, version: impl Into<String>) -> VersionKey {
        VersionKey {
            repository: self.repository.clone(),
            resource: self.resource.clone(),
            branch: self.branch.clone(),
            version: version.into(),
        }
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        self.resource_key().validate()?;
        validate_name(NameKind::Branch, &self.branch)
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.repository, self.resource, self.branch)
    }
}

impl FromStr for BranchKey {
    type Err = TypeError;

    /// Parse `repository/resource/branch`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let [repository, resource, branch] = parts.as_slice() else {
            return Err(TypeError::InvalidName {
                kind: NameKind::Branch,
                name: s.to_string(),
                reason: "expected repository/resource/branch".into(),
            });
        };
        let key = Self::new(*repository, *resource, *branch);
        key.validate()?;
        Ok(key)
    }
}

/// A single version on a branch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionKey {
    pub repository: String,
    pub resource: String,
    pub branch: String,
    pub version: String,
}

impl VersionKey {
    pub fn new(
        repository: impl Into<String>,
        resource: impl Into<String>,
        branch: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            resource: resource.into(),
            branch: branch.into(),
            version: version.into(),
        }
    }

    /// The branch this version belongs to.
    pub fn branch_key(&self) -> BranchKey {
        BranchKey::new(
            self.repository.clone(),
            self.resource.clone(),
            self.branch.clone(),
        )
    }

    /// Path segments in blob-key order: repository, resource, branch, version.
    pub fn segments(&self) -> [&str; 4] {
        [&self.repository, &self.resource, &self.branch, &self.version]
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        self.branch_key().validate()?;
        validate_name(NameKind::Version, &self.version)
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.repository, self.resource, self.branch, self.version
        )
    }
}

impl FromStr for VersionKey {
    type Err = TypeError;

    /// Parse `repository/resource/branch@version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((branch, version)) = s.rsplit_once('@') else {
            return Err(TypeError::InvalidName {
                kind: NameKind::Version,
                name: s.to_string(),
                reason: "expected repository/resource/branch@version".into(),
            });
        };
        let key = branch.parse::<BranchKey>()?.version(version);
        key.validate()?;
        Ok(key)
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of payload a version carries.
///
/// A mesh is a single file; a material is a set of texture files stored
/// under one per-version folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Mesh,
    Material,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::Material => "material",
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Mesh)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mesh" => Ok(Self::Mesh),
            "material" => Ok(Self::Material),
            _ => Err(TypeError::UnknownResourceType(s.to_string())),
        }
    }
}

//! Opaque cross-store references.
//!
//! A locator is `prefix + "/" + rest`, where the prefix identifies the store
//! (an endpoint plus bucket, or a document collection) and `rest` is the
//! store-local path or id. Locators are parsed back by stripping the prefix.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Builds and parses locators for one store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorScheme {
    prefix: String,
}

impl LocatorScheme {
    /// Create a scheme. Trailing slashes on the prefix are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Compose a locator for a store-local path or id.
    pub fn compose(&self, local: &str) -> String {
        format!("{}/{}", self.prefix, local.trim_start_matches('/'))
    }

    /// Strip the prefix, returning the store-local part.
    pub fn strip<'a>(&self, locator: &'a str) -> Result<&'a str, TypeError> {
        locator
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| TypeError::ForeignLocator {
                locator: locator.to_string(),
                expected: self.prefix.clone(),
            })
    }

    /// Returns `true` if the locator was produced by this scheme.
    pub fn owns(&self, locator: &str) -> bool {
        self.strip(locator).is_ok()
    }
}

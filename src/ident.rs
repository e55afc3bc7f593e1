//! Opaque, validated tenant/stream identifiers.
//!
//! Both are non-empty strings (§3); `Collection` additionally canonicalizes
//! to lower case on construction, so every downstream component can compare
//! and hash collection names without re-deriving the canonical form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A tenant / namespace for collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Project(String);

impl Project {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::MalformedEvent("project must not be empty".into()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named stream of events within a project, canonicalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Collection(String);

impl Collection {
    /// Build a collection name, lower-casing it per §3 invariant 4.
    pub fn new(name: impl AsRef<str>) -> Result<Self, Error> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(Error::MalformedEvent("collection must not be empty".into()));
        }
        Ok(Self(name.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

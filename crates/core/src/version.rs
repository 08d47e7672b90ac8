//! Content version labels.
//!
//! A version is an owner-chosen label that partitions all content into
//! independent draft/published timelines. The only rule is that the label
//! is non-empty once surrounding whitespace is removed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Version selected when nothing has been chosen or persisted yet.
pub const DEFAULT_VERSION: &str = "7";

/// A trimmed, non-empty content version label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// Parse a raw label, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation(
                "Version must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parse an optional label, returning `None` for missing or blank input.
    ///
    /// Used for share-link parameters where a blank value means "keep the
    /// current version".
    pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|r| Self::parse(r).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self(DEFAULT_VERSION.to_string())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Shared types used across the Observatory crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rejected site name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid site: {reason}")]
pub struct InvalidSite {
    /// Why the site name was rejected
    pub reason: String,
}

/// Newtype for the host name submitted to the scanning service.
///
/// Only emptiness is checked locally; anything else (unknown host, bad
/// DNS name) is for the remote service to judge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Site(String);

impl Site {
    /// Create a new `Site` from a host name.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// Returns error if the name is empty once trimmed.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidSite> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(InvalidSite {
                reason: "empty site name".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Site {
    type Error = InvalidSite;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Site> for String {
    fn from(site: Site) -> Self {
        site.0
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

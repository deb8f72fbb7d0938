//! The persisted version record

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::write_json;
use crate::{Error, Result};

/// Semantic version triple stored in `version_info.json`
///
/// Ordering is lexicographic over (major, minor, patch), which is what
/// release comparisons need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionRecord {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Default for VersionRecord {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl VersionRecord {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Load the record, falling back to 1.0.0 when the file does not exist
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("{} not found, using default version", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::version(
                format!("Failed to parse {}: {}", path, e),
                r#"Expected {"major": <int>, "minor": <int>, "patch": <int>}"#,
            )
        })
    }

    /// Overwrite the record file
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        write_json(path, self)
    }

    /// The next patch release
    pub fn bumped_patch(self) -> Result<Self> {
        let patch = self.patch.checked_add(1).ok_or_else(|| {
            Error::version(
                format!("Patch component of {} cannot be incremented", self),
                "Raise the minor version by hand",
            )
        })?;
        Ok(Self { patch, ..self })
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::version(
                format!("Invalid version string: {:?}", s),
                "Versions are written as MAJOR.MINOR.PATCH, e.g. 1.0.3",
            )
        };

        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let mut parts = trimmed.split('.');
        let mut next = || -> Result<u32> {
            parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(invalid)
        };
        let (major, minor, patch) = (next()?, next()?, next()?);

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(major, minor, patch))
    }
}

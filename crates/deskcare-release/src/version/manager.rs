//! Version operations
//!
//! `get`, `bump` and `update_header` as used by the release scripts.

use camino::{Utf8Path, Utf8PathBuf};

use crate::Result;
use crate::config::HeaderConfig;
use crate::project::Project;
use crate::utils::ensure_parent_dir;

use super::{VersionRecord, render_header};

/// Manager for the version record and the generated header
#[derive(Debug, Clone)]
pub struct VersionManager {
    record_path: Utf8PathBuf,
    header_path: Utf8PathBuf,
    header: HeaderConfig,
}

impl VersionManager {
    /// Create a manager for explicit paths
    pub fn new(
        record_path: impl Into<Utf8PathBuf>,
        header_path: impl Into<Utf8PathBuf>,
        header: HeaderConfig,
    ) -> Self {
        Self {
            record_path: record_path.into(),
            header_path: header_path.into(),
            header,
        }
    }

    /// Create a manager for a project's configured paths
    pub fn for_project(project: &Project) -> Self {
        Self::new(
            project.version_file(),
            project.version_header(),
            project.config.header.clone(),
        )
    }

    /// Path of the version record
    pub fn record_path(&self) -> &Utf8Path {
        &self.record_path
    }

    /// Path of the generated header
    pub fn header_path(&self) -> &Utf8Path {
        &self.header_path
    }

    /// Current version; 1.0.0 when no record exists yet
    pub fn get(&self) -> Result<VersionRecord> {
        VersionRecord::load(&self.record_path)
    }

    /// Increment the patch component, persist it and regenerate the header
    pub fn bump(&self) -> Result<VersionRecord> {
        let current = self.get()?;
        let next = current.bumped_patch()?;

        next.save(&self.record_path)?;
        tracing::info!("Bumped version {} -> {}", current, next);

        self.write_header(&next)?;
        Ok(next)
    }

    /// Regenerate the header from the persisted record
    pub fn update_header(&self) -> Result<VersionRecord> {
        let version = self.get()?;
        self.write_header(&version)?;
        Ok(version)
    }

    fn write_header(&self, version: &VersionRecord) -> Result<()> {
        ensure_parent_dir(&self.header_path)?;
        std::fs::write(&self.header_path, render_header(version, &self.header))?;
        tracing::info!("Updated {} to {}", self.header_path, version);
        Ok(())
    }
}

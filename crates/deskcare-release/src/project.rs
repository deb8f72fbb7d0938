//! Project root and path resolution
//!
//! A `Project` is the configuration loaded once at startup together with the
//! directory it was loaded from. Every command receives it explicitly.

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Config;
use crate::version::VersionRecord;
use crate::{Error, Result};

/// A DeskCare project checkout
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project
    pub root: Utf8PathBuf,

    /// Configuration
    pub config: Config,
}

impl Project {
    /// Load the project rooted at `root`
    pub fn discover(root: &Utf8Path) -> Result<Self> {
        let config = Config::load(root)?;
        Self::with_config(root, config)
    }

    /// Create a project with a specific configuration
    pub fn with_config(root: &Utf8Path, config: Config) -> Result<Self> {
        let root = root.canonicalize_utf8().map_err(|e| {
            Error::config(
                format!("Failed to canonicalize project root {}: {}", root, e),
                "Ensure the path exists and is accessible",
            )
        })?;

        Ok(Project { root, config })
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Path of the version record
    pub fn version_file(&self) -> Utf8PathBuf {
        self.resolve(&self.config.project.version_file)
    }

    /// Path of the generated version header
    pub fn version_header(&self) -> Utf8PathBuf {
        self.resolve(&self.config.project.version_header)
    }

    /// Archive file name for a version, e.g. `DeskCare_v1.2.3.zip`
    pub fn archive_name(&self, version: &VersionRecord) -> String {
        format!("{}_v{}.zip", self.config.project.product_name, version)
    }

    /// Local path of the archive for a version
    pub fn archive_path(&self, version: &VersionRecord) -> Utf8PathBuf {
        self.resolve(&self.config.archive.output_dir)
            .join(self.archive_name(version))
    }

    /// Build output directory that gets archived
    pub fn archive_source_dir(&self) -> Utf8PathBuf {
        self.resolve(&self.config.archive.source_dir)
    }

    /// Website downloads directory
    pub fn publish_dir(&self) -> Utf8PathBuf {
        self.resolve(&self.config.archive.publish_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_archive_name_uses_product_and_version() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let project = Project::with_config(root, Config::default()).unwrap();

        let version = VersionRecord::new(1, 2, 3);
        assert_eq!(project.archive_name(&version), "DeskCare_v1.2.3.zip");
        assert_eq!(
            project.archive_path(&version),
            project.root.join(".").join("DeskCare_v1.2.3.zip")
        );
    }

    #[test]
    fn test_resolve_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let mut config = Config::default();
        config.project.product_name = "Widget".to_string();
        config.archive.publish_dir = Utf8PathBuf::from("/srv/downloads");
        let project = Project::with_config(root, config).unwrap();

        assert_eq!(project.publish_dir(), Utf8PathBuf::from("/srv/downloads"));
        assert!(project.version_header().ends_with("src/core/Version.h"));
        assert!(project.version_file().starts_with(&project.root));
        assert_eq!(
            project.archive_name(&VersionRecord::new(2, 0, 7)),
            "Widget_v2.0.7.zip"
        );
    }

    #[test]
    fn test_missing_root_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap().join("nope");

        let result = Project::discover(&root);
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}

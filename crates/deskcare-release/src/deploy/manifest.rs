//! Release manifest served to clients for update checks

use camino::Utf8Path;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{ManifestConfig, expand_placeholders};
use crate::utils::write_json;
use crate::version::VersionRecord;
use crate::Result;

/// Contents of `version.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    /// Newest published version
    pub latest_version: String,
    /// Day the release was deployed
    pub release_date: NaiveDate,
    /// Where clients download the archive
    pub download_url: String,
    /// Free text shown in the update dialog
    pub changelog: String,
    /// Oldest version that can still update in place
    pub min_supported_version: String,
}

impl ReleaseManifest {
    /// Build the manifest for a release
    pub fn build(
        version: &VersionRecord,
        release_date: NaiveDate,
        host: &str,
        archive_name: &str,
        config: &ManifestConfig,
    ) -> Self {
        let version_string = version.to_string();
        let download_url = expand_placeholders(
            &config.download_url,
            &[
                ("host", host),
                ("archive", archive_name),
                ("version", version_string.as_str()),
            ],
        );

        Self {
            latest_version: version_string,
            release_date,
            download_url,
            changelog: config.changelog.clone(),
            min_supported_version: config.min_supported_version.clone(),
        }
    }

    /// Write the manifest as UTF-8 JSON
    pub fn write(&self, path: &Utf8Path) -> Result<()> {
        write_json(path, self)
    }
}

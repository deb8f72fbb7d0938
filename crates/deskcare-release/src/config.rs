//! Configuration file parsing and merging
//!
//! This module handles parsing of `deskcare.toml` and `deskcare.local.toml`.
//! The local file is meant for machine-specific values (deploy host, key
//! paths) and is merged over the base file.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Name of the committed configuration file
pub const CONFIG_FILE: &str = "deskcare.toml";

/// Name of the machine-local override file
pub const LOCAL_CONFIG_FILE: &str = "deskcare.local.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Product and version file locations
    pub project: ProjectConfig,

    /// Generated version header settings
    pub header: HeaderConfig,

    /// Archive packaging settings
    pub archive: ArchiveConfig,

    /// Website deployment settings
    pub deploy: DeployConfig,
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Product name used in archive file names (default: "DeskCare")
    pub product_name: String,

    /// Version record JSON file (default: "version_info.json")
    pub version_file: Utf8PathBuf,

    /// Generated version header (default: "src/core/Version.h")
    pub version_header: Utf8PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            product_name: "DeskCare".to_string(),
            version_file: Utf8PathBuf::from("version_info.json"),
            version_header: Utf8PathBuf::from("src/core/Version.h"),
        }
    }
}

/// Version header configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Include guard macro (default: "VERSION_H")
    pub guard: String,

    /// Prefix of the generated version macros (default: "APP_VERSION")
    pub macro_prefix: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            guard: "VERSION_H".to_string(),
            macro_prefix: "APP_VERSION".to_string(),
        }
    }
}

/// Archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Build output directory to archive (default: "dist")
    pub source_dir: Utf8PathBuf,

    /// Directory the archive is written to (default: ".")
    pub output_dir: Utf8PathBuf,

    /// Website downloads directory receiving a copy of the archive
    pub publish_dir: Utf8PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            source_dir: Utf8PathBuf::from("dist"),
            output_dir: Utf8PathBuf::from("."),
            publish_dir: Utf8PathBuf::from("website_project/official_site/public/downloads"),
        }
    }
}

/// A single file uploaded verbatim to a fixed remote path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptUpload {
    /// Local path, relative to the project root
    pub local: Utf8PathBuf,

    /// Absolute remote path
    pub remote: String,
}

/// Deploy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Remote host name or address
    pub host: Option<String>,

    /// SSH port (default: 22)
    pub port: u16,

    /// Login user (default: "root")
    pub username: String,

    /// Environment variable holding the login password
    pub password_env: String,

    /// Private key for public-key authentication, preferred over the password
    pub identity_file: Option<Utf8PathBuf>,

    /// Environment variable holding the private key passphrase
    pub passphrase_env: Option<String>,

    /// OpenSSH known_hosts file used to verify the server key
    pub known_hosts: Option<Utf8PathBuf>,

    /// Built website assets to mirror (default: "website_project/official_site/dist")
    pub local_dir: Utf8PathBuf,

    /// Remote staging directory (default: "/tmp")
    pub remote_dir: String,

    /// Configuration and setup files uploaded after the assets
    pub scripts: Vec<ScriptUpload>,

    /// Upload the versioned archive (default: true)
    pub upload_archive: bool,

    /// Strip carriage returns from uploaded shell scripts (default: false)
    pub normalize_line_endings: bool,

    /// Remote command that performs the installation
    pub setup_command: String,

    /// Treat a non-zero exit of the setup command as a failure (default: false)
    pub fail_on_script_error: bool,

    /// Release manifest settings
    pub manifest: ManifestConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 22,
            username: "root".to_string(),
            password_env: "DESKCARE_DEPLOY_PASSWORD".to_string(),
            identity_file: None,
            passphrase_env: None,
            known_hosts: None,
            local_dir: Utf8PathBuf::from("website_project/official_site/dist"),
            remote_dir: "/tmp".to_string(),
            scripts: vec![
                ScriptUpload {
                    local: Utf8PathBuf::from("website_project/deploy/setup_remote.sh"),
                    remote: "/tmp/setup_remote.sh".to_string(),
                },
                ScriptUpload {
                    local: Utf8PathBuf::from("website_project/deploy/exercise_site.conf"),
                    remote: "/tmp/exercise_site.conf".to_string(),
                },
            ],
            upload_archive: true,
            normalize_line_endings: false,
            setup_command: "bash /tmp/setup_remote.sh {archive}".to_string(),
            fail_on_script_error: false,
            manifest: ManifestConfig::default(),
        }
    }
}

/// Release manifest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Generate and upload the manifest (default: true)
    pub enabled: bool,

    /// Where the manifest is written locally before upload
    pub local_path: Utf8PathBuf,

    /// Remote path of the uploaded manifest
    pub remote_path: String,

    /// Download URL template, supports `{host}`, `{archive}` and `{version}`
    pub download_url: String,

    /// Changelog text shown to clients
    pub changelog: String,

    /// Oldest client version that can still update in place
    pub min_supported_version: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            local_path: Utf8PathBuf::from("website_project/version.json"),
            remote_path: "/tmp/version.json".to_string(),
            download_url: "http://{host}/updates/{archive}".to_string(),
            changelog: "Latest release with performance improvements and bug fixes.".to_string(),
            min_supported_version: "1.0.0".to_string(),
        }
    }
}

/// Resolved login credentials
pub enum Credentials {
    /// Password authentication
    Password(String),
    /// Public-key authentication
    KeyFile {
        path: Utf8PathBuf,
        passphrase: Option<String>,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password(_) => f.write_str("Password(<redacted>)"),
            Credentials::KeyFile { path, passphrase } => f
                .debug_struct("KeyFile")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

impl DeployConfig {
    /// Get the configured host or fail with a configuration error
    pub fn require_host(&self) -> Result<&str> {
        match self.host.as_deref() {
            Some(host) if !host.trim().is_empty() => Ok(host),
            _ => Err(Error::config(
                "No deploy host configured",
                format!("Set `host` under [deploy] in {}", LOCAL_CONFIG_FILE),
            )),
        }
    }

    /// Resolve credentials from the process environment
    pub fn credentials(&self, project_root: &Utf8Path) -> Result<Credentials> {
        self.credentials_with(project_root, |name| std::env::var(name).ok())
    }

    /// Resolve credentials using a custom variable lookup
    pub fn credentials_with<F>(&self, project_root: &Utf8Path, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref identity) = self.identity_file {
            let path = if identity.is_absolute() {
                identity.clone()
            } else {
                project_root.join(identity)
            };
            let passphrase = self.passphrase_env.as_deref().and_then(&lookup);
            return Ok(Credentials::KeyFile { path, passphrase });
        }

        match lookup(&self.password_env) {
            Some(password) if !password.is_empty() => Ok(Credentials::Password(password)),
            _ => Err(Error::config(
                format!(
                    "No credentials available: ${} is not set",
                    self.password_env
                ),
                "Export the password variable or set `identity_file` under [deploy]",
            )),
        }
    }
}

impl Config {
    /// Load configuration from a project directory.
    ///
    /// This loads `deskcare.toml` and merges `deskcare.local.toml` over it if it exists.
    pub fn load(project_root: &Utf8Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        let local_config_path = project_root.join(LOCAL_CONFIG_FILE);

        let base_config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<toml::Value>(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let local_config = if local_config_path.exists() {
            let content = std::fs::read_to_string(&local_config_path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        } else {
            None
        };

        let merged = if let Some(local) = local_config {
            tracing::debug!("Merging {}", local_config_path);
            merge_toml_values(base_config, local)
        } else {
            base_config
        };

        let config: Config = merged.try_into()?;

        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Replace `{name}` placeholders in a template
pub fn expand_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.project.product_name, "DeskCare");
        assert_eq!(
            config.project.version_file,
            Utf8PathBuf::from("version_info.json")
        );
        assert_eq!(config.header.macro_prefix, "APP_VERSION");
        assert_eq!(config.archive.source_dir, Utf8PathBuf::from("dist"));
        assert!(config.deploy.host.is_none());
        assert_eq!(config.deploy.port, 22);
        assert_eq!(config.deploy.remote_dir, "/tmp");
        assert_eq!(config.deploy.scripts.len(), 2);
        assert!(config.deploy.manifest.enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[project]
product_name = "Widget"
version_file = "meta/version.json"

[archive]
source_dir = "out"

[deploy]
host = "example.org"
port = 2222
username = "deploy"
remote_dir = "/srv/stage"
normalize_line_endings = true
upload_archive = false
scripts = [{ local = "ops/setup.sh", remote = "/srv/stage/setup.sh" }]

[deploy.manifest]
enabled = false
changelog = "Fixes"
"#;

        let config = Config::parse(content).unwrap();

        assert_eq!(config.project.product_name, "Widget");
        assert_eq!(
            config.project.version_file,
            Utf8PathBuf::from("meta/version.json")
        );
        // Unset fields keep their defaults
        assert_eq!(
            config.project.version_header,
            Utf8PathBuf::from("src/core/Version.h")
        );
        assert_eq!(config.archive.source_dir, Utf8PathBuf::from("out"));
        assert_eq!(config.deploy.host.as_deref(), Some("example.org"));
        assert_eq!(config.deploy.port, 2222);
        assert!(config.deploy.normalize_line_endings);
        assert!(!config.deploy.upload_archive);
        assert_eq!(
            config.deploy.scripts,
            vec![ScriptUpload {
                local: Utf8PathBuf::from("ops/setup.sh"),
                remote: "/srv/stage/setup.sh".to_string(),
            }]
        );
        assert!(!config.deploy.manifest.enabled);
        assert_eq!(config.deploy.manifest.changelog, "Fixes");
    }

    #[test]
    fn test_load_merges_local_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        std::fs::write(
            root.join(CONFIG_FILE),
            r#"
[deploy]
port = 22
username = "root"
scripts = [{ local = "a.sh", remote = "/tmp/a.sh" }, { local = "b.conf", remote = "/tmp/b.conf" }]
"#,
        )
        .unwrap();
        std::fs::write(
            root.join(LOCAL_CONFIG_FILE),
            r#"
[deploy]
host = "10.0.0.5"
scripts = [{ local = "c.sh", remote = "/tmp/c.sh" }]
"#,
        )
        .unwrap();

        let config = Config::load(root).unwrap();

        assert_eq!(config.deploy.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.deploy.username, "root");
        // Arrays are replaced, not appended
        assert_eq!(config.deploy.scripts.len(), 1);
        assert_eq!(config.deploy.scripts[0].remote, "/tmp/c.sh");
    }

    #[test]
    fn test_load_missing_config_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        let config = Config::load(root).unwrap();

        assert_eq!(config.project.product_name, "DeskCare");
        assert!(config.deploy.host.is_none());
    }

    #[test]
    fn test_require_host() {
        let mut deploy = DeployConfig::default();
        assert!(matches!(deploy.require_host(), Err(Error::Config { .. })));

        deploy.host = Some("  ".to_string());
        assert!(deploy.require_host().is_err());

        deploy.host = Some("example.org".to_string());
        assert_eq!(deploy.require_host().unwrap(), "example.org");
    }

    #[test]
    fn test_credentials_from_password_env() {
        let deploy = DeployConfig::default();
        let root = Utf8Path::new("/project");

        let creds = deploy
            .credentials_with(root, |name| {
                (name == "DESKCARE_DEPLOY_PASSWORD").then(|| "s3cret".to_string())
            })
            .unwrap();
        assert!(matches!(creds, Credentials::Password(ref p) if p == "s3cret"));
        assert!(!format!("{:?}", creds).contains("s3cret"));

        let missing = deploy.credentials_with(root, |_| None);
        assert!(matches!(missing, Err(Error::Config { .. })));
    }

    #[test]
    fn test_credentials_prefer_identity_file() {
        let deploy = DeployConfig {
            identity_file: Some(Utf8PathBuf::from("keys/deploy_ed25519")),
            passphrase_env: Some("KEY_PASS".to_string()),
            ..DeployConfig::default()
        };

        let creds = deploy
            .credentials_with(Utf8Path::new("/project"), |name| match name {
                "KEY_PASS" => Some("phrase".to_string()),
                _ => Some("password".to_string()),
            })
            .unwrap();

        match creds {
            Credentials::KeyFile { path, passphrase } => {
                assert_eq!(path, Utf8PathBuf::from("/project/keys/deploy_ed25519"));
                assert_eq!(passphrase.as_deref(), Some("phrase"));
            }
            other => panic!("expected key file credentials, got {:?}", other),
        }
    }

    #[test]
    fn test_expand_placeholders() {
        assert_eq!(
            expand_placeholders(
                "http://{host}/updates/{archive}",
                &[("host", "example.org"), ("archive", "DeskCare_v1.2.3.zip")]
            ),
            "http://example.org/updates/DeskCare_v1.2.3.zip"
        );
        // Unknown placeholders are left untouched
        assert_eq!(
            expand_placeholders("bash {script}", &[("archive", "x.zip")]),
            "bash {script}"
        );
    }
}

//! Website deployment pipeline
//!
//! A [`DeployPlan`] is resolved from the project before any connection is
//! made, so missing inputs and configuration mistakes fail early. Executing
//! it runs the steps strictly in order:
//!
//! 1. Mirror the built website into the remote staging directory
//! 2. Upload configuration and setup scripts
//! 3. Upload the versioned archive, if present
//! 4. Write and upload the release manifest
//! 5. Strip carriage returns from uploaded shell scripts
//! 6. Run the setup command and stream its output

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use std::fmt;

use crate::config::{Credentials, expand_placeholders};
use crate::project::Project;
use crate::version::VersionRecord;
use crate::{Error, Result};

use super::manifest::ReleaseManifest;
use super::mirror::{MirrorStats, MirrorStep, execute_mirror, plan_mirror, upload_count};
use super::remote::{RemoteHost, remote_join, shell_quote};
use super::session::{ConnectOptions, SshSession};

/// The versioned archive upload
#[derive(Debug, Clone)]
pub struct ArchiveUpload {
    pub local: Utf8PathBuf,
    pub remote: String,
}

/// Manifest written locally and uploaded
#[derive(Debug, Clone)]
pub struct ManifestUpload {
    pub manifest: ReleaseManifest,
    pub local: Utf8PathBuf,
    pub remote: String,
}

/// Everything a deployment will do, resolved up front
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub connect: ConnectOptions,
    pub local_dir: Utf8PathBuf,
    pub remote_dir: String,
    pub mirror: Vec<MirrorStep>,
    pub scripts: Vec<(Utf8PathBuf, String)>,
    pub archive: Option<ArchiveUpload>,
    pub manifest: Option<ManifestUpload>,
    pub normalize: Vec<String>,
    pub setup_command: String,
    pub fail_on_script_error: bool,
}

/// Summary of a finished deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub mirror: MirrorStats,
    pub scripts_uploaded: usize,
    pub archive_uploaded: bool,
    pub manifest_uploaded: bool,
    pub output_lines: usize,
    pub exit_status: i32,
}

impl DeployPlan {
    /// Resolve the plan for releasing `version` on `release_date`
    pub fn resolve(
        project: &Project,
        version: &VersionRecord,
        release_date: NaiveDate,
    ) -> Result<Self> {
        let deploy = &project.config.deploy;
        let host = deploy.require_host()?.to_string();
        let archive_name = project.archive_name(version);
        let remote_dir = deploy.remote_dir.clone();

        let local_dir = project.resolve(&deploy.local_dir);
        let mirror = plan_mirror(&local_dir, &remote_dir)?;

        let mut scripts = Vec::with_capacity(deploy.scripts.len());
        for script in &deploy.scripts {
            let local = project.resolve(&script.local);
            if !local.is_file() {
                return Err(Error::deploy(
                    format!("{} does not exist", local),
                    "Check the `scripts` list under [deploy]",
                ));
            }
            scripts.push((local, script.remote.clone()));
        }

        let archive = deploy.upload_archive.then(|| ArchiveUpload {
            local: project.archive_path(version),
            remote: remote_join(&remote_dir, &archive_name),
        });

        let manifest = if deploy.manifest.enabled {
            Some(ManifestUpload {
                manifest: ReleaseManifest::build(
                    version,
                    release_date,
                    &host,
                    &archive_name,
                    &deploy.manifest,
                ),
                local: project.resolve(&deploy.manifest.local_path),
                remote: deploy.manifest.remote_path.clone(),
            })
        } else {
            None
        };

        let normalize = if deploy.normalize_line_endings {
            scripts
                .iter()
                .filter(|(_, remote)| remote.ends_with(".sh"))
                .map(|(_, remote)| remote.clone())
                .collect()
        } else {
            Vec::new()
        };

        let version_string = version.to_string();
        let setup_command = expand_placeholders(
            &deploy.setup_command,
            &[
                ("archive", archive_name.as_str()),
                ("version", version_string.as_str()),
                ("host", host.as_str()),
                ("remote_dir", remote_dir.as_str()),
            ],
        );

        Ok(Self {
            connect: ConnectOptions {
                host,
                port: deploy.port,
                username: deploy.username.clone(),
                known_hosts: deploy.known_hosts.as_ref().map(|p| project.resolve(p)),
            },
            local_dir,
            remote_dir,
            mirror,
            scripts,
            archive,
            manifest,
            normalize,
            setup_command,
            fail_on_script_error: deploy.fail_on_script_error,
        })
    }

    /// Run every step against `remote`
    pub fn execute<R>(&self, remote: &mut R) -> Result<DeployReport>
    where
        R: RemoteHost + ?Sized,
    {
        let mut report = DeployReport::default();

        tracing::info!("Uploading from {} to {}...", self.local_dir, self.remote_dir);
        report.mirror = execute_mirror(remote, &self.mirror)?;

        tracing::info!("Uploading config and scripts...");
        for (local, dest) in &self.scripts {
            tracing::info!("  Uploading {}", dest);
            remote.upload(local, dest)?;
            report.scripts_uploaded += 1;
        }

        if let Some(ref archive) = self.archive {
            if archive.local.is_file() {
                tracing::info!("Uploading {}...", archive.local);
                remote.upload(&archive.local, &archive.remote)?;
                report.archive_uploaded = true;
            } else {
                tracing::warn!("Archive not found at {}", archive.local);
            }
        }

        if let Some(ref upload) = self.manifest {
            upload.manifest.write(&upload.local)?;
            tracing::info!("Uploading {}...", upload.remote);
            remote.upload(&upload.local, &upload.remote)?;
            report.manifest_uploaded = true;
        }

        for script in &self.normalize {
            tracing::info!("Normalizing line endings of {}", script);
            let command = format!("sed -i 's/\\r$//' {}", shell_quote(script));
            let status = remote.exec(&command, &mut |line: &str| tracing::warn!("{}", line))?;
            if status != 0 {
                tracing::warn!("Line ending normalization exited with status {}", status);
            }
        }

        tracing::info!("Executing remote setup script...");
        let mut output_lines = 0;
        let status = remote.exec(&self.setup_command, &mut |line: &str| {
            output_lines += 1;
            tracing::debug!(target: "remote_output", "{}", line);
            println!("{}", line);
        })?;
        report.output_lines = output_lines;
        report.exit_status = status;

        if status != 0 {
            if self.fail_on_script_error {
                return Err(Error::deploy(
                    format!("Remote setup command exited with status {}", status),
                    "See the remote output above",
                ));
            }
            tracing::warn!("Remote setup command exited with status {}", status);
        }

        Ok(report)
    }
}

impl fmt::Display for DeployPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Host: {}@{}:{}",
            self.connect.username, self.connect.host, self.connect.port
        )?;
        writeln!(
            f,
            "Assets: {} -> {} ({} files)",
            self.local_dir,
            self.remote_dir,
            upload_count(&self.mirror)
        )?;
        for (local, remote) in &self.scripts {
            writeln!(f, "Script: {} -> {}", local, remote)?;
        }
        if let Some(ref archive) = self.archive {
            let note = if archive.local.is_file() {
                ""
            } else {
                " (missing)"
            };
            writeln!(f, "Archive: {} -> {}{}", archive.local, archive.remote, note)?;
        }
        if let Some(ref upload) = self.manifest {
            writeln!(
                f,
                "Manifest: {} ({}) -> {}",
                upload.manifest.latest_version, upload.manifest.download_url, upload.remote
            )?;
        }
        for script in &self.normalize {
            writeln!(f, "Normalize: {}", script)?;
        }
        write!(f, "Setup: {}", self.setup_command)
    }
}

/// Deploy the website for `version` to the configured host
pub fn deploy(project: &Project, version: &VersionRecord) -> Result<DeployReport> {
    let today = chrono::Local::now().date_naive();
    let plan = DeployPlan::resolve(project, version, today)?;
    let credentials: Credentials = project.config.deploy.credentials(&project.root)?;

    let mut session = SshSession::connect(&plan.connect, &credentials)?;
    let result = plan.execute(&mut session);
    let closed = session.close();

    let report = result?;
    closed?;
    Ok(report)
}

//! Directory tree mirroring
//!
//! A local tree is turned into an ordered list of steps. Every remote
//! directory is ensured exactly once and before any file below it.

use camino::{Utf8Path, Utf8PathBuf};
use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use walkdir::WalkDir;

use crate::utils::{slash_path, utf8_path};
use crate::{Error, Result};

use super::remote::{RemoteHost, remote_join};

/// A single mirroring step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorStep {
    /// Create the remote directory if it does not exist
    EnsureDir(String),
    /// Upload a local file to a remote path
    Upload { local: Utf8PathBuf, remote: String },
}

/// Counters reported after mirroring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub created_dirs: usize,
    pub uploaded_files: usize,
}

/// Plan the upload of `local_root` into `remote_root`
pub fn plan_mirror(local_root: &Utf8Path, remote_root: &str) -> Result<Vec<MirrorStep>> {
    if !local_root.is_dir() {
        return Err(Error::deploy(
            format!("{} does not exist", local_root),
            "Build the website first (npm run build)",
        ));
    }

    let mut steps = vec![MirrorStep::EnsureDir(remote_root.to_string())];

    // Directories are yielded before their contents
    for entry in WalkDir::new(local_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            Error::deploy(
                format!("Failed to read directory entry: {}", e),
                "Check directory permissions",
            )
        })?;

        let path = utf8_path(entry.path())?;
        let rel_path = path.strip_prefix(local_root).map_err(|_| {
            Error::deploy(
                format!("Failed to strip source prefix from {}", path),
                "This is an unexpected internal error",
            )
        })?;
        let remote = remote_join(remote_root, &slash_path(rel_path));

        if entry.file_type().is_dir() {
            steps.push(MirrorStep::EnsureDir(remote));
        } else if path.is_file() {
            steps.push(MirrorStep::Upload {
                local: path,
                remote,
            });
        } else {
            tracing::debug!("Skipping non-file entry {}", path);
        }
    }

    Ok(steps)
}

fn upload_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} files")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Number of uploads in a plan
pub fn upload_count(steps: &[MirrorStep]) -> usize {
    steps
        .iter()
        .filter(|s| matches!(s, MirrorStep::Upload { .. }))
        .count()
}

/// Execute a mirror plan against a remote host
pub fn execute_mirror<R>(remote: &mut R, steps: &[MirrorStep]) -> Result<MirrorStats>
where
    R: RemoteHost + ?Sized,
{
    let mut stats = MirrorStats::default();

    let span = tracing::info_span!("mirror");
    span.pb_set_style(&upload_style());
    span.pb_set_length(upload_count(steps) as u64);
    span.pb_set_message("uploading assets");
    let _guard = span.enter();

    for step in steps {
        match step {
            MirrorStep::EnsureDir(dir) => {
                if remote.ensure_dir(dir)? {
                    tracing::debug!("Created remote directory {}", dir);
                    stats.created_dirs += 1;
                }
            }
            MirrorStep::Upload { local, remote: dest } => {
                tracing::info!("  Uploading {}", dest);
                remote.upload(local, dest)?;
                stats.uploaded_files += 1;
                Span::current().pb_inc(1);
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::remote::fake::{Call, FakeRemote};
    use std::fs;
    use tempfile::TempDir;

    fn utf8_root(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(temp_dir.path()).unwrap().to_path_buf()
    }

    #[test]
    fn test_plan_nested_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/c.txt"), "c").unwrap();
        fs::write(root.join("index.html"), "<html>").unwrap();

        let steps = plan_mirror(&root, "/tmp").unwrap();

        assert_eq!(
            steps,
            vec![
                MirrorStep::EnsureDir("/tmp".to_string()),
                MirrorStep::EnsureDir("/tmp/a".to_string()),
                MirrorStep::EnsureDir("/tmp/a/b".to_string()),
                MirrorStep::Upload {
                    local: root.join("a/b/c.txt"),
                    remote: "/tmp/a/b/c.txt".to_string(),
                },
                MirrorStep::Upload {
                    local: root.join("index.html"),
                    remote: "/tmp/index.html".to_string(),
                },
            ]
        );
        assert_eq!(upload_count(&steps), 2);
    }

    #[test]
    fn test_execute_creates_dirs_before_upload() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/c.txt"), "nested").unwrap();

        let steps = plan_mirror(&root, "/tmp").unwrap();
        let mut remote = FakeRemote::with_dirs(&["/tmp"]);
        let stats = execute_mirror(&mut remote, &steps).unwrap();

        assert_eq!(
            stats,
            MirrorStats {
                created_dirs: 2,
                uploaded_files: 1
            }
        );
        let mkdir_a = remote.index_of(&Call::Mkdir("/tmp/a".to_string()));
        let mkdir_b = remote.index_of(&Call::Mkdir("/tmp/a/b".to_string()));
        let upload = remote.index_of(&Call::Upload("/tmp/a/b/c.txt".to_string()));
        assert!(mkdir_a < mkdir_b && mkdir_b < upload);
        assert_eq!(remote.files["/tmp/a/b/c.txt"], b"nested");
    }

    #[test]
    fn test_existing_remote_dirs_are_not_recreated() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        fs::create_dir_all(root.join("assets/img")).unwrap();
        fs::write(root.join("assets/img/logo.png"), "png").unwrap();

        let steps = plan_mirror(&root, "/tmp").unwrap();
        let mut remote = FakeRemote::with_dirs(&["/tmp", "/tmp/assets"]);
        let stats = execute_mirror(&mut remote, &steps).unwrap();

        assert_eq!(stats.created_dirs, 1);
        assert!(!remote.calls.contains(&Call::Mkdir("/tmp/assets".to_string())));
        assert!(remote.files.contains_key("/tmp/assets/img/logo.png"));
    }

    #[test]
    fn test_missing_local_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir).join("dist");

        let result = plan_mirror(&root, "/tmp");
        assert!(matches!(result, Err(Error::Deploy { .. })));
    }
}

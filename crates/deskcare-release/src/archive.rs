//! Release archive creation and publishing
//!
//! The build output directory is packed into `<product>_v<version>.zip`
//! with paths relative to the directory root, then copied into the
//! website's downloads folder.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{BufWriter, Write};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::project::Project;
use crate::utils::{ensure_parent_dir, slash_path, utf8_path};
use crate::version::VersionRecord;
use crate::{Error, Result};

/// A file that will be stored in the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Absolute path on disk
    pub path: Utf8PathBuf,
    /// Entry name inside the archive, `/` separated
    pub name: String,
}

/// Result of packaging a release
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    /// Written archive
    pub archive: Utf8PathBuf,
    /// Copy in the website downloads folder
    pub published: Utf8PathBuf,
    /// Number of files stored
    pub files: usize,
}

/// Packs a directory tree into a zip archive
#[derive(Debug, Clone)]
pub struct Archiver {
    source_dir: Utf8PathBuf,
}

impl Archiver {
    /// Create an archiver for `source_dir`
    pub fn new(source_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }

    /// Source directory being archived
    pub fn source_dir(&self) -> &Utf8Path {
        &self.source_dir
    }

    /// List every regular file under the source directory, sorted by path
    pub fn collect_entries(&self) -> Result<Vec<ArchiveEntry>> {
        if !self.source_dir.is_dir() {
            return Err(Error::archive(
                format!("{} does not exist", self.source_dir),
                "Build the application first so the output directory is populated",
            ));
        }

        let mut entries = Vec::new();

        for entry in WalkDir::new(&self.source_dir)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                Error::archive(
                    format!("Failed to read directory entry: {}", e),
                    "Check directory permissions",
                )
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            // Symlinks count when they resolve to a file
            if !entry.path().is_file() {
                tracing::debug!("Skipping non-file entry {:?}", entry.path());
                continue;
            }

            let path = utf8_path(entry.path())?;
            let rel_path = path.strip_prefix(&self.source_dir).map_err(|_| {
                Error::archive(
                    format!("Failed to strip source prefix from {}", path),
                    "This is an unexpected internal error",
                )
            })?;
            let name = slash_path(rel_path);

            entries.push(ArchiveEntry { path, name });
        }

        Ok(entries)
    }

    /// Write the archive to `dest`, replacing any existing file
    ///
    /// Nothing is written or removed when the source directory is missing.
    pub fn create(&self, dest: &Utf8Path) -> Result<usize> {
        let entries = self.collect_entries()?;

        tracing::info!("Compressing {} to {}...", self.source_dir, dest);

        if dest.exists() {
            std::fs::remove_file(dest)?;
        }
        ensure_parent_dir(dest)?;

        let file = File::create(dest)?;
        let mut zip = zip::ZipWriter::new(BufWriter::new(file));

        for entry in &entries {
            tracing::info!("  Adding: {}", entry.name);

            let size = std::fs::metadata(&entry.path)?.len();
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(size >= u32::MAX as u64);

            zip.start_file(entry.name.as_str(), options)?;
            let mut source = File::open(&entry.path)?;
            std::io::copy(&mut source, &mut zip)?;
        }

        zip.finish()?.flush()?;

        tracing::info!("Archive created with {} files", entries.len());
        Ok(entries.len())
    }
}

/// Copy `archive` into `publish_dir`, creating the directory if needed
pub fn publish(archive: &Utf8Path, publish_dir: &Utf8Path) -> Result<Utf8PathBuf> {
    let file_name = archive.file_name().ok_or_else(|| {
        Error::archive(
            format!("{} has no file name", archive),
            "This is an unexpected internal error",
        )
    })?;

    if !publish_dir.exists() {
        std::fs::create_dir_all(publish_dir)?;
        tracing::info!("Created directory: {}", publish_dir);
    }

    let dest = publish_dir.join(file_name);

    // Copying a file onto itself truncates it
    let source = archive.canonicalize_utf8()?;
    if publish_dir.canonicalize_utf8()?.join(file_name) == source {
        tracing::info!("Archive already in {}, nothing to copy", publish_dir);
        return Ok(dest);
    }

    std::fs::copy(archive, &dest)?;
    tracing::info!("Copied archive to {}", dest);

    Ok(dest)
}

/// Archive the project's build output for `version` and publish it
pub fn package_release(project: &Project, version: &VersionRecord) -> Result<PackageOutcome> {
    let archiver = Archiver::new(project.archive_source_dir());
    let archive = project.archive_path(version);

    let files = archiver.create(&archive)?;
    let published = publish(&archive, &project.publish_dir())?;

    Ok(PackageOutcome {
        archive,
        published,
        files,
    })
}

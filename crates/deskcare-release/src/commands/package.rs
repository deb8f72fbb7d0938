//! Package command implementation

use clap::Args;
use miette::Result;

use crate::archive::{Archiver, package_release};
use crate::project::Project;
use crate::version::VersionManager;

/// Arguments for the package command
#[derive(Debug, Args)]
pub struct PackageArgs {
    /// Dry run - list the files that would be archived
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the package command
pub fn run(project: &Project, args: PackageArgs) -> Result<()> {
    let version = VersionManager::for_project(project).get()?;

    if args.dry_run {
        let entries = Archiver::new(project.archive_source_dir()).collect_entries()?;

        println!("Would create {}:", project.archive_path(&version));
        for entry in &entries {
            println!("  - {}", entry.name);
        }
        println!("\nPublish to: {}", project.publish_dir());
        return Ok(());
    }

    let outcome = package_release(project, &version)?;

    tracing::info!("Packaged {} files into {}", outcome.files, outcome.archive);
    tracing::info!("Published to {}", outcome.published);
    Ok(())
}

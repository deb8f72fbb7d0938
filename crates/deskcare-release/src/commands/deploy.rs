//! Deploy command implementation

use clap::Args;
use miette::Result;

use crate::deploy::{DeployPlan, deploy};
use crate::project::Project;
use crate::version::VersionManager;

/// Arguments for the deploy command
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Dry run - show what would be uploaded and executed
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the deploy command
pub fn run(project: &Project, args: DeployArgs) -> Result<()> {
    let version = VersionManager::for_project(project).get()?;

    if args.dry_run {
        let today = chrono::Local::now().date_naive();
        let plan = DeployPlan::resolve(project, &version, today)?;
        println!("Would deploy version {}:", version);
        println!("{}", plan);
        return Ok(());
    }

    tracing::info!("Deploying version {}", version);
    let report = deploy(project, &version)?;

    tracing::info!(
        "Uploaded {} asset files ({} directories created)",
        report.mirror.uploaded_files,
        report.mirror.created_dirs
    );
    tracing::info!("Deployment successful!");
    Ok(())
}

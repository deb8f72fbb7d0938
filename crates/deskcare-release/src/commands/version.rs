//! Version command implementation

use clap::{Args, ValueEnum};
use miette::Result;

use crate::project::Project;
use crate::version::VersionManager;

/// Version operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VersionAction {
    /// Increment the patch version and regenerate the header
    Bump,
    /// Print the current version
    Get,
    /// Regenerate the header from the current version
    #[value(name = "update_header", alias = "update-header")]
    UpdateHeader,
}

/// Arguments for the version command
#[derive(Debug, Args)]
pub struct VersionArgs {
    /// Operation to run; prints the current version and usage when omitted
    pub action: Option<VersionAction>,
}

/// Run the version command
pub fn run(project: &Project, args: VersionArgs) -> Result<()> {
    let manager = VersionManager::for_project(project);

    match args.action {
        Some(VersionAction::Bump) => {
            let version = manager.bump()?;
            println!("BUMPED_VERSION={}", version);
        }
        Some(VersionAction::Get) => {
            let version = manager.get()?;
            println!("CURRENT_VERSION={}", version);
        }
        Some(VersionAction::UpdateHeader) => {
            manager.update_header()?;
        }
        None => {
            let version = manager.get()?;
            println!("Current Version: {}", version);
            println!("Usage: deskcare-release version [bump|get|update_header]");
        }
    }

    Ok(())
}

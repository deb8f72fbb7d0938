//! deskcare-release CLI - DeskCare release packaging and deployment

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use deskcare_release::commands;
use deskcare_release::project::Project;

/// deskcare-release - DeskCare release packaging and deployment
#[derive(Debug, Parser)]
#[command(name = "deskcare-release")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root directory
    #[arg(short = 'w', long, global = true)]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read or bump the version record and regenerate the version header
    Version(commands::version::VersionArgs),

    /// Zip the build output and publish it to the website downloads
    Package(commands::package::PackageArgs),

    /// Upload the website and release archive and run the remote setup
    Deploy(commands::deploy::DeployArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Log lines are drawn above the upload progress bar
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .with(filter)
        .init();

    // Determine project root
    let project_root = if let Some(ref path) = cli.workspace {
        camino::Utf8PathBuf::from(path)
    } else {
        std::env::current_dir()
            .ok()
            .and_then(|p| camino::Utf8PathBuf::try_from(p).ok())
            .unwrap_or_else(|| camino::Utf8PathBuf::from("."))
    };

    let project = Project::discover(&project_root)?;

    match cli.command {
        Commands::Version(args) => commands::version::run(&project, args),
        Commands::Package(args) => commands::package::run(&project, args),
        Commands::Deploy(args) => commands::deploy::run(&project, args),
    }
}

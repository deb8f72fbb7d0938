//! CLI subcommand implementations

pub mod deploy;
pub mod package;
pub mod version;

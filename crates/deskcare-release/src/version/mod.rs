//! Version record management
//!
//! This module provides:
//! - The persisted `{major, minor, patch}` record and its string form
//! - Generation of the version header compiled into the application
//! - The `VersionManager` operations behind `deskcare-release version`

mod header;
mod manager;
mod record;

pub use header::render_header;
pub use manager::VersionManager;
pub use record::VersionRecord;

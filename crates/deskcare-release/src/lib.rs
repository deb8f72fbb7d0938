//! deskcare-release - release packaging and website deployment for DeskCare
//!
//! This crate provides both a library and CLI, including:
//! - Configuration file parsing and merging
//! - The persisted version record and generated version header
//! - Zip packaging of the build output and publishing to the website
//! - Website deployment over SSH/SFTP with a release manifest

pub mod archive;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod project;
pub mod utils;
pub mod version;

pub use error::{Error, Result};

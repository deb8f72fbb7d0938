//! Website deployment over SSH/SFTP
//!
//! This module provides:
//! - Mirroring: uploading a local directory tree to a remote root
//! - Release manifest generation for client update checks
//! - The deploy pipeline and its SSH-backed remote host

mod manifest;
mod mirror;
mod pipeline;
mod remote;
mod session;

pub use manifest::ReleaseManifest;
pub use mirror::{MirrorStats, MirrorStep, execute_mirror, plan_mirror};
pub use pipeline::{ArchiveUpload, DeployPlan, DeployReport, ManifestUpload, deploy};
pub use remote::{RemoteHost, remote_join};
pub use session::{ConnectOptions, SshSession};

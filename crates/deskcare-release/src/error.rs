//! Error types for deskcare-release

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for deskcare-release operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for deskcare-release
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON error
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Zip archive error
    #[error("Archive I/O error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// SSH or SFTP protocol error
    #[error("SSH error: {0}")]
    #[diagnostic(help("Check the host, port and credentials in the [deploy] section"))]
    Ssh(#[from] ssh2::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },

    /// Version record error
    #[error("Version error: {message}")]
    Version {
        message: String,
        #[help]
        help: String,
    },

    /// Archive creation or publishing error
    #[error("Archive error: {message}")]
    Archive {
        message: String,
        #[help]
        help: String,
    },

    /// Remote host error
    #[error("Remote error: {message}")]
    Remote {
        message: String,
        #[help]
        help: String,
    },

    /// Deploy error
    #[error("Deploy error: {message}")]
    Deploy {
        message: String,
        #[help]
        help: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a version error
    pub fn version(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Version {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create an archive error
    pub fn archive(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a remote error
    pub fn remote(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a deploy error
    pub fn deploy(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Deploy {
            message: message.into(),
            help: help.into(),
        }
    }
}

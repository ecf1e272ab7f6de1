//! Errors raised while setting up or rotating file handlers

use std::io;
use std::path::PathBuf;

/// Result alias for file handler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by [`FileHandler`](crate::FileHandler) and
/// [`RotatingFileHandler`](crate::RotatingFileHandler)
///
/// Write failures never appear here: handlers report those through
/// `tracing` and keep going.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unclassified I/O failure, such as spawning the monitor thread
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The log directory could not be created
    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// Directory that was requested
        path: PathBuf,
        /// Cause reported by the filesystem
        source: io::Error,
    },

    /// The live file could not be opened for appending
    #[error("Failed to open log file at {path}: {source}")]
    Open {
        /// File that was requested
        path: PathBuf,
        /// Cause reported by the filesystem
        source: io::Error,
    },

    /// One or more rotation steps failed; the steps are joined with `; `
    #[error("Failed to rotate log file: {0}")]
    Rotation(String),

    /// Configuration values that cannot produce a working handler
    #[error("Invalid rotating file configuration: {0}")]
    Configuration(String),

    /// Configuration text is not valid TOML for [`RotatingFileConfig`](crate::RotatingFileConfig)
    #[error("Failed to parse rotating file configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

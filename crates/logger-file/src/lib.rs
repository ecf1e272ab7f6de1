//! File-backed handlers for ferrolog
//!
//! This crate provides:
//! - [`FileHandler`]: appends to a single file, never rotates
//! - [`RotatingFileHandler`]: rotates the live file by size into a fixed ring
//!   of `<filename>.<n>.log` archives, checked by a background monitor
//! - [`RotatingFileConfig`]: builder and TOML configuration for the latter

#![warn(missing_docs, unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod file;
mod rotating;

pub use config::{
    DEFAULT_CHECK_INTERVAL, DEFAULT_MAX_FILES, DEFAULT_MAX_SIZE, RotatingFileConfig,
    RotatingFileConfigBuilder,
};
pub use error::{Error, Result};
pub use file::FileHandler;
pub use rotating::RotatingFileHandler;

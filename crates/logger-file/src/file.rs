//! Plain append-only file handler

use crate::error::{Error, Result};
use ferrolog::{Flags, FormattedWriter, Handler};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Open `path` for appending, creating it if needed
pub(crate) fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Handler bound to a single file; never rotates
#[derive(Debug)]
pub struct FileHandler {
    writer: FormattedWriter,
    path: PathBuf,
    closed: AtomicBool,
}

impl FileHandler {
    /// Open (or create) `path` for appending with the standard prefix
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_flags(path, Flags::STD)
    }

    /// Open (or create) `path` for appending with specific prefix flags
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened.
    pub fn with_flags(path: impl Into<PathBuf>, flags: Flags) -> Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;

        Ok(Self {
            writer: FormattedWriter::new(file, "", flags),
            path,
            closed: AtomicBool::new(false),
        })
    }

    /// Path this handler writes to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Handler for FileHandler {
    fn writer(&self) -> &FormattedWriter {
        &self.writer
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.writer.close_output() {
            tracing::warn!("Failed to flush {} on close: {}", self.path.display(), e);
        }
    }
}

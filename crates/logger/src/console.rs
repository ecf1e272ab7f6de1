//! Console handler writing to standard error

use crate::{Flags, FormattedWriter, Handler};

/// Handler bound to the process's standard error stream
///
/// The stream is not owned, so [`Handler::close`] does nothing.
#[derive(Debug)]
pub struct ConsoleHandler {
    writer: FormattedWriter,
}

impl ConsoleHandler {
    /// Create a console handler with the standard date and time prefix
    #[must_use]
    pub fn new() -> Self {
        Self::with_flags(Flags::STD)
    }

    /// Create a console handler with specific prefix flags
    #[must_use]
    pub fn with_flags(flags: Flags) -> Self {
        Self {
            writer: FormattedWriter::new(std::io::stderr(), "", flags),
        }
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ConsoleHandler {
    fn writer(&self) -> &FormattedWriter {
        &self.writer
    }

    fn close(&self) {}
}

//! Handler capability trait

use crate::writer::{FormattedWriter, Sink};
use crate::{Flags, Level, Record};
use std::fmt;
use std::io;

/// An output destination
///
/// Implementors own a [`FormattedWriter`] and supply only [`Handler::writer`]
/// and [`Handler::close`]; formatting, sink swaps and the leveled emit methods
/// are provided. Emit methods write unconditionally: severity filtering is the
/// dispatcher's job.
pub trait Handler: Send + Sync + 'static {
    /// The writer records are formatted through
    fn writer(&self) -> &FormattedWriter;

    /// Release the handler's resources
    ///
    /// Must be idempotent.
    fn close(&self);

    /// Write a record, returning any sink error
    ///
    /// # Errors
    ///
    /// Propagates the sink's write error.
    fn output(&self, record: &Record<'_>) -> io::Result<()> {
        self.writer().output(record)
    }

    /// Replace the sink for subsequent writes
    fn set_output(&self, sink: Sink) {
        self.writer().set_output(sink);
    }

    /// Current prefix flags
    fn flags(&self) -> Flags {
        self.writer().flags()
    }

    /// Replace the prefix flags
    fn set_flags(&self, flags: Flags) {
        self.writer().set_flags(flags);
    }

    /// Current textual prefix
    fn prefix(&self) -> String {
        self.writer().prefix()
    }

    /// Replace the textual prefix
    fn set_prefix(&self, prefix: &str) {
        self.writer().set_prefix(prefix);
    }

    /// Flush the sink, reporting failures to the diagnostics channel
    fn flush(&self) {
        if let Err(e) = self.writer().flush() {
            tracing::warn!("Failed to flush log handler: {}", e);
        }
    }

    /// Write a record, best effort
    fn print(&self, record: &Record<'_>) {
        if let Err(e) = self.output(record) {
            tracing::warn!("Failed to write log record: {}", e);
        }
    }

    /// Write a record labeled with `level`, best effort
    fn emit(&self, level: Level, record: &Record<'_>) {
        let labeled = record.clone().with_level(level);
        self.print(&labeled);
    }

    /// Write a debug record
    fn debug(&self, record: &Record<'_>) {
        self.emit(Level::Debug, record);
    }

    /// Write an info record
    fn info(&self, record: &Record<'_>) {
        self.emit(Level::Info, record);
    }

    /// Write a warning record
    fn warn(&self, record: &Record<'_>) {
        self.emit(Level::Warn, record);
    }

    /// Write an error record
    fn error(&self, record: &Record<'_>) {
        self.emit(Level::Error, record);
    }
}

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("writer", self.writer())
            .finish()
    }
}

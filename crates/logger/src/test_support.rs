//! Test support utilities
//!
//! In-memory sinks and a capturing handler for asserting on log output.
//! Available to downstream crates through the `test-support` feature.

use crate::{Flags, FormattedWriter, Handler};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable in-memory sink; every clone sees the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Written lines without their terminators
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Discard everything written so far
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A handler that captures output in memory
#[derive(Debug)]
pub struct CaptureHandler {
    writer: FormattedWriter,
    sink: MemorySink,
    closed: AtomicBool,
}

impl CaptureHandler {
    /// Create a capture handler without any prefix so lines are easy to match
    #[must_use]
    pub fn new() -> Self {
        Self::with_flags(Flags::NONE)
    }

    /// Create a capture handler with specific prefix flags
    #[must_use]
    pub fn with_flags(flags: Flags) -> Self {
        let sink = MemorySink::new();
        Self {
            writer: FormattedWriter::new(sink.clone(), "", flags),
            sink,
            closed: AtomicBool::new(false),
        }
    }

    /// Everything captured so far
    #[must_use]
    pub fn contents(&self) -> String {
        self.sink.contents()
    }

    /// Captured lines without their terminators
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.sink.lines()
    }

    /// Check if the captured output contains `text`
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.contents().contains(text)
    }

    /// Clear captured output
    pub fn clear(&self) {
        self.sink.clear();
    }

    /// Whether [`Handler::close`] has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for CaptureHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for CaptureHandler {
    fn writer(&self) -> &FormattedWriter {
        &self.writer
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.writer.close_output() {
            tracing::warn!("Failed to flush capture handler on close: {}", e);
        }
    }
}

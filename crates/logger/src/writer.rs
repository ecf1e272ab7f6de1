//! Formatted writer shared by every handler
//!
//! Renders the configured prefix in front of each record and writes the whole
//! line to the current sink in one call. The sink sits behind the same lock as
//! the formatting state, so a sink swap can never be observed halfway through
//! a line.

use crate::{Flags, Record};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Destination of formatted records
pub type Sink = Box<dyn Write + Send>;

/// Sink installed once a handler has released its real destination
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosedSink;

impl Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "handler closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Inner {
    sink: Sink,
    prefix: String,
    flags: Flags,
    line: String,
}

/// Writes prefixed, newline-terminated records to a swappable sink
pub struct FormattedWriter {
    inner: Mutex<Inner>,
}

impl FormattedWriter {
    /// Create a writer over `sink`
    pub fn new(sink: impl Write + Send + 'static, prefix: impl Into<String>, flags: Flags) -> Self {
        Self::from_sink(Box::new(sink), prefix, flags)
    }

    /// Create a writer over an already boxed sink
    pub fn from_sink(sink: Sink, prefix: impl Into<String>, flags: Flags) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sink,
                prefix: prefix.into(),
                flags,
                line: String::with_capacity(256),
            }),
        }
    }

    /// Format `record` and write it to the current sink
    ///
    /// # Errors
    ///
    /// Returns whatever the sink returned.
    pub fn output(&self, record: &Record<'_>) -> io::Result<()> {
        let now = Utc::now();
        let body = record.body();

        let mut guard = self.inner.lock();
        let Inner {
            sink,
            prefix,
            flags,
            line,
        } = &mut *guard;

        line.clear();
        format_header(line, *flags, prefix, now, record);
        line.push_str(&body);
        if !line.ends_with('\n') {
            line.push('\n');
        }

        sink.write_all(line.as_bytes())
    }

    /// Replace the sink for subsequent writes
    ///
    /// The previous sink is flushed and dropped.
    pub fn set_output(&self, sink: Sink) {
        let previous = {
            let mut inner = self.inner.lock();
            std::mem::replace(&mut inner.sink, sink)
        };
        release(previous);
    }

    /// Flush and drop the sink, leaving a [`ClosedSink`] in its place
    ///
    /// # Errors
    ///
    /// Returns the error from the final flush.
    pub fn close_output(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        let result = inner.sink.flush();
        inner.sink = Box::new(ClosedSink);
        result
    }

    /// Run `f` with exclusive access to the sink
    ///
    /// Writers block until `f` returns.
    pub fn with_output<R>(&self, f: impl FnOnce(&mut Sink) -> R) -> R {
        let mut inner = self.inner.lock();
        f(&mut inner.sink)
    }

    /// Current flags
    pub fn flags(&self) -> Flags {
        self.inner.lock().flags
    }

    /// Replace the flags
    pub fn set_flags(&self, flags: Flags) {
        self.inner.lock().flags = flags;
    }

    /// Current textual prefix
    pub fn prefix(&self) -> String {
        self.inner.lock().prefix.clone()
    }

    /// Replace the textual prefix
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.lock().prefix = prefix.into();
    }

    /// Flush the sink
    ///
    /// # Errors
    ///
    /// Returns the sink's flush error.
    pub fn flush(&self) -> io::Result<()> {
        self.inner.lock().sink.flush()
    }
}

impl std::fmt::Debug for FormattedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FormattedWriter")
            .field("prefix", &inner.prefix)
            .field("flags", &inner.flags)
            .finish_non_exhaustive()
    }
}

fn release(mut sink: Sink) {
    if let Err(e) = sink.flush() {
        tracing::warn!("Failed to flush replaced log sink: {}", e);
    }
}

fn format_header(
    line: &mut String,
    flags: Flags,
    prefix: &str,
    now: DateTime<Utc>,
    record: &Record<'_>,
) {
    if !flags.contains(Flags::MSG_PREFIX) {
        line.push_str(prefix);
    }

    if flags.intersects(Flags::DATE | Flags::TIME | Flags::MICROSECONDS) {
        let stamp: NaiveDateTime = if flags.contains(Flags::UTC) {
            now.naive_utc()
        } else {
            now.with_timezone(&Local).naive_local()
        };

        if flags.contains(Flags::DATE) {
            let _ = write!(line, "{} ", stamp.format("%Y/%m/%d"));
        }
        if flags.intersects(Flags::TIME | Flags::MICROSECONDS) {
            let _ = write!(line, "{}", stamp.format("%H:%M:%S"));
            if flags.contains(Flags::MICROSECONDS) {
                let _ = write!(line, "{}", stamp.format("%.6f"));
            }
            line.push(' ');
        }
    }

    if flags.intersects(Flags::SHORT_FILE | Flags::LONG_FILE) {
        let file = if flags.contains(Flags::SHORT_FILE) {
            record.location.short_file()
        } else {
            record.location.file
        };
        let _ = write!(line, "{file}:{}: ", record.location.line);
    }

    if flags.contains(Flags::MSG_PREFIX) {
        line.push_str(prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySink;
    use crate::{Level, Location};

    fn record(message: &str) -> Record<'_> {
        Record::new(message, Location::new("src/app/main.rs", 42))
    }

    #[test]
    fn test_plain_record_gets_newline() {
        let sink = MemorySink::new();
        let writer = FormattedWriter::new(sink.clone(), "", Flags::NONE);

        writer.output(&record("hello")).unwrap();
        writer.output(&record("already terminated\n")).unwrap();

        assert_eq!(sink.contents(), "hello\nalready terminated\n");
    }

    #[test]
    fn test_level_label_and_short_file() {
        let sink = MemorySink::new();
        let writer = FormattedWriter::new(sink.clone(), "", Flags::SHORT_FILE);

        writer
            .output(&record("disk almost full").with_level(Level::Warn))
            .unwrap();

        assert_eq!(sink.contents(), "main.rs:42: warn disk almost full\n");
    }

    #[test]
    fn test_long_file_and_prefix_placement() {
        let sink = MemorySink::new();
        let writer = FormattedWriter::new(sink.clone(), "[svc] ", Flags::LONG_FILE);
        writer.output(&record("a")).unwrap();

        writer.set_flags(Flags::LONG_FILE | Flags::MSG_PREFIX);
        writer.output(&record("b")).unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "[svc] src/app/main.rs:42: a".to_string(),
                "src/app/main.rs:42: [svc] b".to_string(),
            ]
        );
    }

    #[test]
    fn test_date_time_layout() {
        let sink = MemorySink::new();
        let flags = Flags::STD | Flags::MICROSECONDS | Flags::UTC;
        let writer = FormattedWriter::new(sink.clone(), "", flags);

        writer.output(&record("tick")).unwrap();

        let line = sink.contents();
        // 2009/01/23 01:23:23.123123 tick
        let (date, rest) = line.split_once(' ').unwrap();
        let (time, message) = rest.split_once(' ').unwrap();
        assert_eq!(date.len(), 10);
        assert_eq!(date.matches('/').count(), 2);
        assert_eq!(time.len(), 15);
        assert_eq!(&time[8..9], ".");
        assert_eq!(message, "tick\n");
    }

    #[test]
    fn test_set_output_is_not_retroactive() {
        let first = MemorySink::new();
        let second = MemorySink::new();
        let writer = FormattedWriter::new(first.clone(), "", Flags::NONE);

        writer.output(&record("one")).unwrap();
        writer.set_output(Box::new(second.clone()));
        writer.output(&record("two")).unwrap();

        assert_eq!(first.contents(), "one\n");
        assert_eq!(second.contents(), "two\n");
    }

    #[test]
    fn test_closed_output_rejects_writes() {
        let writer = FormattedWriter::new(MemorySink::new(), "", Flags::NONE);
        writer.close_output().unwrap();

        let err = writer.output(&record("late")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}

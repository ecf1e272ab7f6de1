//! Size-rotating file handler
//!
//! The handler writes to `<dir>/<filename>` (the live file). When the live
//! file reaches `max_size` bytes it is renamed to `<dir>/<filename>.<n>.log`,
//! where `n` cycles through `1..=max_files`, and a fresh live file takes its
//! place. A monitor thread re-checks the size every `check_interval`.
//!
//! Rotation runs with exclusive access to the writer's sink, so a concurrent
//! record lands whole in either the old or the new file. Rotation failures are
//! reported through `tracing` and never reach the logging caller; the next
//! check tries again if the size condition still holds.

use crate::config::{RotatingFileConfig, archive_path};
use crate::error::{Error, Result};
use crate::file::open_append;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use ferrolog::{ClosedSink, FormattedWriter, Handler, Sink};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct RotationState {
    /// Last archive slot written, 0 before the first rotation
    suffix: usize,
    closed: bool,
    /// The sink is a `ClosedSink` because no live file could be opened
    degraded: bool,
}

#[derive(Debug)]
struct Shared {
    writer: FormattedWriter,
    config: RotatingFileConfig,
    live_path: PathBuf,
    state: Mutex<RotationState>,
}

impl Shared {
    fn rotation_due(&self) -> bool {
        self.config.rotation_enabled() && file_size(&self.live_path) >= self.config.max_size
    }

    /// One monitor evaluation; returns whether a rotation was attempted
    fn check(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }

        if state.degraded {
            self.reopen(&mut state);
        }

        if !self.rotation_due() {
            return false;
        }

        if let Err(e) = self.rotate_locked(&mut state) {
            error!("{}", e);
        }
        true
    }

    fn reopen(&self, state: &mut RotationState) {
        match open_append(&self.live_path) {
            Ok(file) => {
                self.writer.set_output(Box::new(file));
                state.degraded = false;
                info!("Reopened log file {}", self.live_path.display());
            }
            Err(e) => warn!("Log file still unavailable: {}", e),
        }
    }

    fn rotate_locked(&self, state: &mut RotationState) -> Result<()> {
        if self.config.max_files == 0 {
            return Err(Error::Rotation(
                "retention of zero leaves no archive slot".into(),
            ));
        }

        state.suffix = state.suffix % self.config.max_files + 1;
        let archive = archive_path(&self.config.dir, &self.config.filename, state.suffix);

        // Diagnostics are emitted after the writer lock is released
        let outcome = self
            .writer
            .with_output(|sink| swap_live_file(sink, &self.live_path, &archive));

        state.degraded = !outcome.has_live_file;
        if !outcome.has_live_file {
            error!(
                "No writable log file at {}; records are dropped until it can be reopened",
                self.live_path.display()
            );
        }

        if outcome.failures.is_empty() {
            debug!(
                "Rotated {} -> {}",
                self.live_path.display(),
                archive.display()
            );
            Ok(())
        } else {
            Err(Error::Rotation(outcome.failures.join("; ")))
        }
    }
}

struct SwapOutcome {
    failures: Vec<String>,
    has_live_file: bool,
}

/// Close the live file, archive it and install a fresh one
///
/// Runs while holding the writer lock.
fn swap_live_file(sink: &mut Sink, live: &Path, archive: &Path) -> SwapOutcome {
    let mut failures = Vec::new();

    if let Err(e) = sink.flush() {
        failures.push(format!("flush {}: {e}", live.display()));
    }
    *sink = Box::new(ClosedSink);

    match fs::remove_file(archive) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => failures.push(format!("remove {}: {e}", archive.display())),
    }

    let renamed = match fs::rename(live, archive) {
        Ok(()) => true,
        Err(e) => {
            failures.push(format!(
                "rename {} -> {}: {e}",
                live.display(),
                archive.display()
            ));
            false
        }
    };

    // Never truncate a live file that was not archived
    let fresh = if renamed {
        File::create(live).map_err(|e| failures.push(format!("create {}: {e}", live.display())))
    } else {
        Err(())
    };

    let file = fresh.ok().or_else(|| match open_append(live) {
        Ok(file) => Some(file),
        Err(e) => {
            failures.push(e.to_string());
            None
        }
    });

    let has_live_file = file.is_some();
    if let Some(file) = file {
        *sink = Box::new(file);
    }

    SwapOutcome {
        failures,
        has_live_file,
    }
}

fn file_size(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            debug!("Cannot stat {}: {}", path.display(), e);
            0
        }
    }
}

struct Monitor {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl Monitor {
    fn spawn(shared: Weak<Shared>, interval: Duration, name: String) -> Result<Self> {
        let (shutdown, shutdown_rx) = channel::bounded(0);

        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || run_monitor(&shared, interval, &shutdown_rx))?;

        Ok(Self { shutdown, thread })
    }

    fn stop(self) {
        drop(self.shutdown);
        if self.thread.join().is_err() {
            error!("Log rotation monitor panicked");
        }
    }
}

fn run_monitor(shared: &Weak<Shared>, interval: Duration, shutdown: &Receiver<()>) {
    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.check();
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Log rotation monitor stopped");
}

/// File handler that rotates the live file by size
///
/// ```no_run
/// use ferrolog::{Dispatcher, Level};
/// use ferrolog_file::RotatingFileHandler;
/// use std::sync::Arc;
///
/// let rotating = RotatingFileHandler::open("/var/log/app", "app.log", 4, 4 * 1024 * 1024)?;
/// let dispatcher = Arc::new(Dispatcher::new(vec![Arc::new(rotating)], Level::Info));
/// let _guard = dispatcher.close_on_drop();
///
/// ferrolog::info!(dispatcher: dispatcher, "service started");
/// # Ok::<(), ferrolog_file::Error>(())
/// ```
pub struct RotatingFileHandler {
    shared: Arc<Shared>,
    monitor: Mutex<Option<Monitor>>,
}

impl RotatingFileHandler {
    /// Open or resume the live file, rotate it if already over the limit and
    /// start the size monitor
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, the directory cannot be
    /// created, the live file cannot be opened or the monitor thread cannot
    /// be spawned.
    pub fn new(config: RotatingFileConfig) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.dir).map_err(|source| Error::CreateDirectory {
            path: config.dir.clone(),
            source,
        })?;

        let live_path = config.live_path();
        let file = open_append(&live_path)?;

        if !config.rotation_enabled() {
            debug!(
                "Rotation disabled for {} (max_files = {}, max_size = {})",
                live_path.display(),
                config.max_files,
                config.max_size
            );
        }

        let interval = config.check_interval;
        let thread_name = format!("log-rotate:{}", config.filename);
        let shared = Arc::new(Shared {
            writer: FormattedWriter::new(file, config.prefix.clone(), config.flags),
            config,
            live_path,
            state: Mutex::new(RotationState::default()),
        });

        shared.check();

        let monitor = Monitor::spawn(Arc::downgrade(&shared), interval, thread_name)?;

        Ok(Self {
            shared,
            monitor: Mutex::new(Some(monitor)),
        })
    }

    /// Shorthand for [`RotatingFileHandler::new`] with default interval and prefix
    ///
    /// # Errors
    ///
    /// See [`RotatingFileHandler::new`].
    pub fn open(
        dir: impl Into<PathBuf>,
        filename: impl Into<String>,
        max_files: usize,
        max_size: u64,
    ) -> Result<Self> {
        let config = RotatingFileConfig::builder(dir, filename)
            .max_files(max_files)
            .max_size(max_size)
            .build()?;
        Self::new(config)
    }

    /// Rotate now if the live file has reached the size limit
    ///
    /// Returns whether a rotation was attempted. Failures are logged.
    pub fn check(&self) -> bool {
        self.shared.check()
    }

    /// Rotate now regardless of size
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rotation`] if the handler is closed, retention is
    /// zero, or any rotation step failed. The handler keeps writing either
    /// way.
    pub fn rotate(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(Error::Rotation("handler is closed".into()));
        }
        self.shared.rotate_locked(&mut state)
    }

    /// Archive slot used by the most recent rotation, 0 if none yet
    pub fn suffix(&self) -> usize {
        self.shared.state.lock().suffix
    }

    /// Configuration the handler was built from
    pub fn config(&self) -> &RotatingFileConfig {
        &self.shared.config
    }

    /// Path of the live file
    pub fn live_path(&self) -> &Path {
        &self.shared.live_path
    }

    /// Path of archive slot `suffix`
    pub fn archive_path(&self, suffix: usize) -> PathBuf {
        self.shared.config.archive_path(suffix)
    }

    /// Close the live file and stop the monitor; idempotent
    pub fn close(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.closed {
                state.closed = true;
                if let Err(e) = self.shared.writer.close_output() {
                    warn!(
                        "Failed to flush {} on close: {}",
                        self.shared.live_path.display(),
                        e
                    );
                }
            }
        }
        self.stop_monitor();
    }

    fn stop_monitor(&self) {
        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            monitor.stop();
        }
    }
}

impl Handler for RotatingFileHandler {
    fn writer(&self) -> &FormattedWriter {
        &self.shared.writer
    }

    fn close(&self) {
        Self::close(self);
    }
}

impl Drop for RotatingFileHandler {
    fn drop(&mut self) {
        self.stop_monitor();
    }
}

impl std::fmt::Debug for RotatingFileHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFileHandler")
            .field("live_path", &self.shared.live_path)
            .field("max_files", &self.shared.config.max_files)
            .field("max_size", &self.shared.config.max_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrolog::{Flags, Location, Record};
    use tempfile::TempDir;
    use tracing_test::traced_test;

    const NEVER: Duration = Duration::from_secs(3600);

    fn handler(dir: &TempDir, max_files: usize, max_size: u64) -> RotatingFileHandler {
        let config = RotatingFileConfig::builder(dir.path(), "app.log")
            .max_files(max_files)
            .max_size(max_size)
            .check_interval(NEVER)
            .flags(Flags::NONE)
            .build()
            .unwrap();
        RotatingFileHandler::new(config).unwrap()
    }

    /// Writes one unlabeled line
    fn write(handler: &RotatingFileHandler, message: &str) {
        handler.print(&Record::new(message, Location::caller()));
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_no_rotation_below_threshold() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 3, 1000);

        for i in 0..10 {
            write(&handler, &format!("record {i}"));
            assert!(!handler.check());
        }

        let expected: String = (0..10).map(|i| format!("record {i}\n")).collect();
        assert_eq!(read(handler.live_path()), expected);
        assert!(!handler.archive_path(1).exists());
        assert_eq!(handler.suffix(), 0);
    }

    #[test]
    fn test_rotation_at_threshold() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 2, 100);

        // Six 20-byte records: 120 bytes
        for i in 0..6 {
            write(&handler, &format!("record number {i:05}"));
        }
        assert_eq!(file_size(handler.live_path()), 120);

        assert!(handler.check());
        write(&handler, "after rotation");

        let archived = read(&handler.archive_path(1));
        assert_eq!(archived.lines().count(), 6);
        assert!(archived.starts_with("record number 00000\n"));
        assert_eq!(read(handler.live_path()), "after rotation\n");
        assert!(!handler.archive_path(2).exists());

        // Live file is small again
        assert!(!handler.check());
        assert_eq!(handler.suffix(), 1);
    }

    #[test]
    fn test_suffix_cycles_and_overwrites_oldest() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 3, 10);

        let mut slots = Vec::new();
        for k in 1..=5 {
            write(&handler, &format!("generation {k}"));
            assert!(handler.check());
            slots.push(handler.suffix());
        }

        assert_eq!(slots, vec![1, 2, 3, 1, 2]);
        assert_eq!(read(&handler.archive_path(1)), "generation 4\n");
        assert_eq!(read(&handler.archive_path(2)), "generation 5\n");
        assert_eq!(read(&handler.archive_path(3)), "generation 3\n");
        assert!(!handler.archive_path(4).exists());
    }

    #[test]
    fn test_retention_of_one_or_zero_never_rotates() {
        for max_files in [0, 1] {
            let dir = TempDir::new().unwrap();
            let handler = handler(&dir, max_files, 10);

            for i in 0..20 {
                write(&handler, &format!("line {i}"));
                assert!(!handler.check());
            }

            assert_eq!(read(handler.live_path()).lines().count(), 20);
            assert!(!handler.archive_path(1).exists());
        }
    }

    #[test]
    fn test_rotates_oversized_file_on_open() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("app.log");
        fs::write(&live, "x".repeat(64)).unwrap();

        let handler = handler(&dir, 2, 50);

        assert_eq!(handler.suffix(), 1);
        assert_eq!(read(&handler.archive_path(1)).len(), 64);
        assert_eq!(read(&live), "");
    }

    #[test]
    fn test_resumes_small_file_on_open() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("app.log");
        fs::write(&live, "kept\n").unwrap();

        let handler = handler(&dir, 2, 50);
        write(&handler, "appended");

        assert_eq!(handler.suffix(), 0);
        assert_eq!(read(&live), "kept\nappended\n");
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        let handler = RotatingFileHandler::open(&nested, "svc.log", 2, 1024).unwrap();

        assert!(nested.join("svc.log").exists());
        handler.close();
    }

    #[test]
    fn test_close_stops_rotation_and_writes() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 2, 10);

        write(&handler, "before close");
        handler.close();
        handler.close();
        write(&handler, "after close");

        assert!(!handler.check());
        assert!(matches!(handler.rotate(), Err(Error::Rotation(_))));
        assert_eq!(read(handler.live_path()), "before close\n");
        assert!(handler.monitor.lock().is_none());
    }

    #[test]
    fn test_forced_rotation() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 1, 1_000_000);

        write(&handler, "small");
        handler.rotate().unwrap();

        assert_eq!(read(&handler.archive_path(1)), "small\n");
        assert_eq!(read(handler.live_path()), "");
    }

    #[test]
    #[traced_test]
    fn test_failed_rotation_keeps_logging() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 2, 10);

        // A non-empty directory in slot 1 can be neither removed nor replaced
        let blocked = handler.archive_path(1);
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("occupied"), "").unwrap();

        write(&handler, "first record");
        assert!(handler.check());
        write(&handler, "second record");

        assert!(logs_contain("Failed to rotate log file"));
        assert_eq!(read(handler.live_path()), "first record\nsecond record\n");

        // The next check moves on to slot 2
        assert!(handler.check());
        assert_eq!(handler.suffix(), 2);
        assert_eq!(
            read(&handler.archive_path(2)),
            "first record\nsecond record\n"
        );
    }

    #[test]
    fn test_monitor_rotates_in_background() {
        let dir = TempDir::new().unwrap();
        let config = RotatingFileConfig::builder(dir.path(), "app.log")
            .max_files(2)
            .max_size(10)
            .check_interval(Duration::from_millis(10))
            .flags(Flags::NONE)
            .build()
            .unwrap();
        let handler = RotatingFileHandler::new(config).unwrap();

        write(&handler, "over the limit");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while handler.suffix() == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(handler.suffix(), 1);
        assert_eq!(read(&handler.archive_path(1)), "over the limit\n");
    }
}

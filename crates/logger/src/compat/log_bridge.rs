//! Bridge from the `log` crate to a ferrolog dispatcher

use crate::{Dispatcher, Level, Location};
use log::{Log, Metadata, Record as LogRecord};
use std::sync::Arc;

/// `log::Log` implementation that forwards to a [`Dispatcher`]
pub struct LogBridge {
    dispatcher: Arc<Dispatcher>,
}

impl LogBridge {
    /// Forward `log` records to `dispatcher`
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.dispatcher.is_enabled(map_level(metadata.level()))
    }

    fn log(&self, record: &LogRecord) {
        // Only compile-time paths can be kept without leaking
        let location = Location::new(
            record.file_static().unwrap_or("<unknown>"),
            record.line().unwrap_or(0),
        );

        self.dispatcher
            .log_at(map_level(record.level()), *record.args(), location);
    }

    fn flush(&self) {
        self.dispatcher.flush();
    }
}

/// Map log levels to ours; `Trace` folds into `Debug`
fn map_level(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

/// Route the log crate's macros through `dispatcher`
///
/// The dispatcher's own level still applies; the log crate's max level is
/// opened fully so that later `set_level` calls take effect.
///
/// # Example
/// ```no_run
/// use ferrolog::{Dispatcher, compat::init_log_bridge};
/// use std::sync::Arc;
///
/// let dispatcher = Arc::new(Dispatcher::default());
/// init_log_bridge(dispatcher).expect("Failed to set log bridge");
/// ```
///
/// # Errors
///
/// Fails if another `log` implementation is already installed.
pub fn init_log_bridge(dispatcher: Arc<Dispatcher>) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(dispatcher)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

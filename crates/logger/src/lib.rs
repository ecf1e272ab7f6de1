//! Leveled logging with fan-out to pluggable handlers
//!
//! A [`Dispatcher`] filters calls by a minimum [`Level`] and writes each
//! surviving record to every registered [`Handler`] in order. Handlers format
//! through a shared [`FormattedWriter`], which applies the configured
//! [`Flags`] prefix and supports swapping the sink underneath live writers.
//!
//! File-backed and size-rotating handlers live in `ferrolog-file`.
//!
//! ```
//! use ferrolog::{Dispatcher, Level, test_support::CaptureHandler};
//! use std::sync::Arc;
//!
//! let capture = Arc::new(CaptureHandler::new());
//! let dispatcher = Dispatcher::new(vec![capture.clone()], Level::Warn);
//!
//! ferrolog::info!(dispatcher: dispatcher, "dropped");
//! ferrolog::warn!(dispatcher: dispatcher, "kept {}", 1);
//!
//! assert_eq!(capture.lines(), vec!["warn kept 1"]);
//! ```
#![warn(missing_docs, unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod console;
mod dispatcher;
mod flags;
mod global;
mod handler;
mod level;
mod record;
mod writer;

pub mod compat;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use console::ConsoleHandler;
pub use dispatcher::{CloseGuard, Dispatcher, FATAL_EXIT_CODE, Fatal, Panic};
pub use flags::Flags;
pub use global::{global, set_global};
pub use handler::Handler;
pub use level::{Level, ParseLevelError};
pub use record::{Location, Record};
pub use writer::{ClosedSink, FormattedWriter, Sink};

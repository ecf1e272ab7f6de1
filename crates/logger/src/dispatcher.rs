//! Fan-out point for log calls
//!
//! A [`Dispatcher`] owns an ordered set of handlers and a minimum level. Each
//! leveled call is dropped when below the minimum and otherwise written to
//! every handler in registration order. Handlers are snapshotted under a read
//! lock before writing, so replacing the set never waits on a slow sink and a
//! handler may itself log through the dispatcher.

use crate::{ConsoleHandler, Flags, Handler, Level, Location, Record};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Exit status used by [`Fatal::exit`]
pub const FATAL_EXIT_CODE: i32 = 1;

struct State {
    handlers: Vec<Arc<dyn Handler>>,
    level: Level,
}

/// Registry of handlers plus a minimum severity
pub struct Dispatcher {
    state: RwLock<State>,
}

impl Dispatcher {
    /// Create a dispatcher with explicit handlers and minimum level
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn Handler>>, level: Level) -> Self {
        Self {
            state: RwLock::new(State { handlers, level }),
        }
    }

    /// Create a dispatcher with no handlers; every call is a no-op until
    /// handlers are registered
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Level::Debug)
    }

    /// Replace the handler set
    pub fn set_handlers(&self, handlers: Vec<Arc<dyn Handler>>) {
        self.state.write().handlers = handlers;
    }

    /// Append a handler after the existing ones
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.state.write().handlers.push(handler);
    }

    /// Snapshot of the current handlers in registration order
    #[must_use]
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.state.read().handlers.clone()
    }

    /// Set the minimum level
    pub fn set_level(&self, level: Level) {
        self.state.write().level = level;
    }

    /// Current minimum level
    #[must_use]
    pub fn level(&self) -> Level {
        self.state.read().level
    }

    /// Whether a record at `level` would be written
    #[must_use]
    pub fn is_enabled(&self, level: Level) -> bool {
        level.passes(self.state.read().level)
    }

    /// Set prefix flags on every current handler
    pub fn set_flags(&self, flags: Flags) {
        for handler in self.handlers() {
            handler.set_flags(flags);
        }
    }

    /// Set the textual prefix on every current handler
    pub fn set_prefix(&self, prefix: &str) {
        for handler in self.handlers() {
            handler.set_prefix(prefix);
        }
    }

    /// Log at `level`, attributing the record to the caller
    #[track_caller]
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.log_at(level, args, Location::caller());
    }

    /// Log at `level` with an explicit source location
    pub fn log_at(&self, level: Level, args: fmt::Arguments<'_>, location: Location) {
        let handlers = {
            let state = self.state.read();
            if !level.passes(state.level) || state.handlers.is_empty() {
                return;
            }
            state.handlers.clone()
        };

        let record = Record::new(render(args), location);
        for handler in &handlers {
            handler.emit(level, &record);
        }
    }

    /// Log a debug record
    #[track_caller]
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Debug, args, Location::caller());
    }

    /// Log an info record
    #[track_caller]
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Info, args, Location::caller());
    }

    /// Log a warning record
    #[track_caller]
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Warn, args, Location::caller());
    }

    /// Log an error record
    #[track_caller]
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Error, args, Location::caller());
    }

    /// Write an unlabeled record to every handler regardless of level
    #[track_caller]
    pub fn print(&self, args: fmt::Arguments<'_>) {
        self.print_at(render(args), Location::caller());
    }

    /// Like [`Dispatcher::print`] with a trailing newline appended
    #[track_caller]
    pub fn println(&self, args: fmt::Arguments<'_>) {
        self.print_at(render_ln(args), Location::caller());
    }

    /// Write an unlabeled record with an explicit source location
    pub fn print_at(&self, message: impl Into<String>, location: Location) {
        let record = Record::new(message.into(), location);
        for handler in self.handlers() {
            handler.print(&record);
        }
    }

    /// Write the message to every handler and hand back the pending exit
    #[track_caller]
    pub fn fatal(&self, args: fmt::Arguments<'_>) -> Fatal {
        self.fatal_at(render(args), Location::caller())
    }

    /// Like [`Dispatcher::fatal`] with a trailing newline appended
    #[track_caller]
    pub fn fatalln(&self, args: fmt::Arguments<'_>) -> Fatal {
        self.fatal_at(render_ln(args), Location::caller())
    }

    /// Write the message and hand back the pending exit, explicit location
    pub fn fatal_at(&self, message: impl Into<String>, location: Location) -> Fatal {
        let message = message.into();
        self.print_at(message.as_str(), location);
        Fatal {
            message,
            handlers: self.handlers(),
        }
    }

    /// Write the message to every handler and hand back the pending panic
    #[track_caller]
    pub fn panic(&self, args: fmt::Arguments<'_>) -> Panic {
        self.panic_at(render(args), Location::caller())
    }

    /// Like [`Dispatcher::panic`] with a trailing newline appended
    #[track_caller]
    pub fn panicln(&self, args: fmt::Arguments<'_>) -> Panic {
        self.panic_at(render_ln(args), Location::caller())
    }

    /// Write the message and hand back the pending panic, explicit location
    pub fn panic_at(&self, message: impl Into<String>, location: Location) -> Panic {
        let message = message.into();
        self.print_at(message.as_str(), location);
        Panic { message }
    }

    /// Flush every handler
    pub fn flush(&self) {
        for handler in self.handlers() {
            handler.flush();
        }
    }

    /// Close every handler in registration order
    pub fn close(&self) {
        for handler in self.handlers() {
            handler.close();
        }
    }

    /// Guard that closes every handler when dropped
    #[must_use = "handlers are closed as soon as the guard is dropped"]
    pub fn close_on_drop(self: &Arc<Self>) -> CloseGuard {
        CloseGuard {
            dispatcher: Arc::clone(self),
        }
    }
}

impl Default for Dispatcher {
    /// One console handler, minimum level `Debug`
    fn default() -> Self {
        Self::new(vec![Arc::new(ConsoleHandler::new())], Level::Debug)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Dispatcher")
            .field("handlers", &state.handlers.len())
            .field("level", &state.level)
            .finish()
    }
}

fn render(args: fmt::Arguments<'_>) -> Cow<'static, str> {
    args.as_str()
        .map_or_else(|| Cow::Owned(args.to_string()), Cow::Borrowed)
}

fn render_ln(args: fmt::Arguments<'_>) -> String {
    let mut message = args.to_string();
    message.push('\n');
    message
}

/// A fatal record has been written; the process should now exit
#[must_use = "call `exit` to terminate the process"]
pub struct Fatal {
    message: String,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Fatal {
    /// The message that was broadcast
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Flush every handler and terminate the process with [`FATAL_EXIT_CODE`]
    pub fn exit(self) -> ! {
        for handler in &self.handlers {
            handler.flush();
        }
        std::process::exit(FATAL_EXIT_CODE)
    }
}

impl fmt::Debug for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fatal")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// A panic record has been written; the caller should now unwind
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "call `raise` to panic with the logged message"]
pub struct Panic {
    message: String,
}

impl Panic {
    /// The message that was broadcast
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Panic with the logged message as a `String` payload
    pub fn raise(self) -> ! {
        std::panic::panic_any(self.message)
    }
}

/// Closes a dispatcher's handlers on drop
#[derive(Debug)]
pub struct CloseGuard {
    dispatcher: Arc<Dispatcher>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.dispatcher.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CaptureHandler;

    fn capture_pair() -> (Dispatcher, Arc<CaptureHandler>, Arc<CaptureHandler>) {
        let first = Arc::new(CaptureHandler::new());
        let second = Arc::new(CaptureHandler::new());
        let dispatcher = Dispatcher::new(vec![first.clone(), second.clone()], Level::Debug);
        (dispatcher, first, second)
    }

    #[test]
    fn test_level_gate() {
        let (dispatcher, first, second) = capture_pair();
        dispatcher.set_level(Level::Warn);

        dispatcher.debug(format_args!("hidden debug"));
        dispatcher.info(format_args!("hidden info"));
        dispatcher.warn(format_args!("shown warn"));
        dispatcher.error(format_args!("shown error {}", 7));

        for handler in [&first, &second] {
            assert_eq!(handler.lines(), vec!["warn shown warn", "error shown error 7"]);
        }
    }

    #[test]
    fn test_empty_handler_set_is_noop() {
        let (dispatcher, first, _) = capture_pair();
        dispatcher.set_handlers(Vec::new());

        dispatcher.error(format_args!("nobody listens"));
        dispatcher.println(format_args!("still nobody"));
        dispatcher.close();

        assert!(first.contents().is_empty());
        assert!(!first.is_closed());
    }

    #[test]
    fn test_set_handlers_replaces() {
        let (dispatcher, first, _) = capture_pair();
        let replacement = Arc::new(CaptureHandler::new());
        dispatcher.set_handlers(vec![replacement.clone()]);

        dispatcher.info(format_args!("after swap"));

        assert!(first.contents().is_empty());
        assert_eq!(replacement.lines(), vec!["info after swap"]);
        assert_eq!(dispatcher.handlers().len(), 1);
    }

    #[test]
    fn test_print_ignores_level() {
        let (dispatcher, first, _) = capture_pair();
        dispatcher.set_level(Level::Error);

        dispatcher.print(format_args!("plain"));
        dispatcher.println(format_args!("line"));

        assert_eq!(first.lines(), vec!["plain", "line"]);
    }

    #[test]
    fn test_set_flags_broadcast() {
        let (dispatcher, first, second) = capture_pair();
        dispatcher.set_flags(Flags::SHORT_FILE);

        assert_eq!(first.flags(), Flags::SHORT_FILE);
        assert_eq!(second.flags(), Flags::SHORT_FILE);

        dispatcher.info(format_args!("located"));
        let line = first.contents();
        assert!(line.starts_with("dispatcher.rs:"), "{line}");
        assert!(line.ends_with(": info located\n"), "{line}");
    }

    #[test]
    fn test_set_prefix_broadcast() {
        let (dispatcher, first, second) = capture_pair();
        dispatcher.set_prefix("[api] ");

        dispatcher.warn(format_args!("slow"));

        assert_eq!(first.lines(), vec!["[api] warn slow"]);
        assert_eq!(second.prefix(), "[api] ");
    }

    #[test]
    fn test_close_reaches_every_handler() {
        let (dispatcher, first, second) = capture_pair();
        dispatcher.close();

        assert!(first.is_closed());
        assert!(second.is_closed());

        // Writes after close fail inside the handler and are swallowed
        dispatcher.error(format_args!("too late"));
        assert!(first.contents().is_empty());
    }

    #[test]
    fn test_close_guard() {
        let handler = Arc::new(CaptureHandler::new());
        let dispatcher = Arc::new(Dispatcher::new(vec![handler.clone()], Level::Debug));

        {
            let _guard = dispatcher.close_on_drop();
            assert!(!handler.is_closed());
        }

        assert!(handler.is_closed());
    }

    #[test]
    fn test_fatal_broadcasts_before_exit() {
        let (dispatcher, first, second) = capture_pair();
        dispatcher.set_level(Level::Error);

        let fatal = dispatcher.fatal(format_args!("cannot bind port {}", 8080));

        assert_eq!(fatal.message(), "cannot bind port 8080");
        assert_eq!(first.lines(), vec!["cannot bind port 8080"]);
        assert_eq!(second.lines(), vec!["cannot bind port 8080"]);
    }

    #[test]
    fn test_panic_outcome_raises_message() {
        let (dispatcher, first, _) = capture_pair();

        let pending = dispatcher.panicln(format_args!("invariant broken"));
        assert_eq!(first.lines(), vec!["invariant broken"]);
        assert_eq!(pending.message(), "invariant broken\n");

        let payload = std::panic::catch_unwind(move || {
            pending.raise();
        })
        .unwrap_err();
        assert_eq!(
            payload.downcast_ref::<String>().map(String::as_str),
            Some("invariant broken\n")
        );
    }

    #[test]
    fn test_panic_formats_arguments() {
        let (dispatcher, first, second) = capture_pair();
        dispatcher.set_level(Level::Error);

        let pending = dispatcher.panic(format_args!("slot {} corrupted", 3));

        assert_eq!(pending.message(), "slot 3 corrupted");
        assert_eq!(first.lines(), vec!["slot 3 corrupted"]);
        assert_eq!(second.lines(), vec!["slot 3 corrupted"]);
    }

    #[test]
    fn test_concurrent_reconfiguration() {
        let handler = Arc::new(CaptureHandler::new());
        let dispatcher = Arc::new(Dispatcher::new(vec![handler.clone()], Level::Debug));

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let dispatcher = Arc::clone(&dispatcher);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        dispatcher.error(format_args!("t{t} n{i}"));
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            dispatcher.set_handlers(vec![handler.clone()]);
            dispatcher.set_level(Level::Debug);
        }

        for writer in writers {
            writer.join().unwrap();
        }

        let lines = handler.lines();
        assert_eq!(lines.len(), 800);
        assert!(lines.iter().all(|line| line.starts_with("error t")));
    }
}

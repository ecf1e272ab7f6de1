//! Process-wide default dispatcher used by the logging macros

use crate::Dispatcher;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<ArcSwap<Dispatcher>> =
    LazyLock::new(|| ArcSwap::from_pointee(Dispatcher::default()));

/// The current default dispatcher
///
/// Starts out as [`Dispatcher::default`]: one console handler at `Debug`.
pub fn global() -> Arc<Dispatcher> {
    GLOBAL.load_full()
}

/// Install a new default dispatcher, returning the previous one
///
/// The previous dispatcher's handlers are left open; close them if nothing
/// else holds it.
pub fn set_global(dispatcher: Arc<Dispatcher>) -> Arc<Dispatcher> {
    GLOBAL.swap(dispatcher)
}

/// Log at a level through the default dispatcher, or an explicit one
#[macro_export]
macro_rules! log {
    (dispatcher: $dispatcher:expr, $level:expr, $($arg:tt)+) => {
        $dispatcher.log_at(
            $level,
            format_args!($($arg)+),
            $crate::Location::new(file!(), line!()),
        )
    };
    ($level:expr, $($arg:tt)+) => {
        $crate::global().log_at(
            $level,
            format_args!($($arg)+),
            $crate::Location::new(file!(), line!()),
        )
    };
}

/// Log a debug record
#[macro_export]
macro_rules! debug {
    (dispatcher: $dispatcher:expr, $($arg:tt)+) => {
        $crate::log!(dispatcher: $dispatcher, $crate::Level::Debug, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Debug, $($arg)+)
    };
}

/// Log an info record
#[macro_export]
macro_rules! info {
    (dispatcher: $dispatcher:expr, $($arg:tt)+) => {
        $crate::log!(dispatcher: $dispatcher, $crate::Level::Info, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Info, $($arg)+)
    };
}

/// Log a warning record
#[macro_export]
macro_rules! warn {
    (dispatcher: $dispatcher:expr, $($arg:tt)+) => {
        $crate::log!(dispatcher: $dispatcher, $crate::Level::Warn, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Warn, $($arg)+)
    };
}

/// Log an error record
#[macro_export]
macro_rules! error {
    (dispatcher: $dispatcher:expr, $($arg:tt)+) => {
        $crate::log!(dispatcher: $dispatcher, $crate::Level::Error, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Error, $($arg)+)
    };
}

/// Write an unlabeled record regardless of level
#[macro_export]
macro_rules! log_print {
    ($($arg:tt)+) => {
        $crate::global().print_at(
            ::std::format!($($arg)+),
            $crate::Location::new(file!(), line!()),
        )
    };
}

/// Write an unlabeled, newline-terminated record regardless of level
#[macro_export]
macro_rules! log_println {
    ($($arg:tt)+) => {
        $crate::global().print_at(
            ::std::format!("{}\n", format_args!($($arg)+)),
            $crate::Location::new(file!(), line!()),
        )
    };
}

/// Write a record to every handler, then exit the process with status 1
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::global()
            .fatal_at(::std::format!($($arg)+), $crate::Location::new(file!(), line!()))
            .exit()
    };
}

/// [`fatal!`] with a trailing newline
#[macro_export]
macro_rules! fatalln {
    ($($arg:tt)+) => {
        $crate::global()
            .fatal_at(
                ::std::format!("{}\n", format_args!($($arg)+)),
                $crate::Location::new(file!(), line!()),
            )
            .exit()
    };
}

/// Write a record to every handler, then panic with the same message
#[macro_export]
macro_rules! log_panic {
    ($($arg:tt)+) => {
        $crate::global()
            .panic_at(::std::format!($($arg)+), $crate::Location::new(file!(), line!()))
            .raise()
    };
}

/// [`log_panic!`] with a trailing newline
#[macro_export]
macro_rules! log_panicln {
    ($($arg:tt)+) => {
        $crate::global()
            .panic_at(
                ::std::format!("{}\n", format_args!($($arg)+)),
                $crate::Location::new(file!(), line!()),
            )
            .raise()
    };
}

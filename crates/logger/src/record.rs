//! Log record type

use crate::Level;
use std::borrow::Cow;
use std::fmt;

/// Source position a record was emitted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Source file as reported by the compiler
    pub file: &'static str,
    /// Line number
    pub line: u32,
}

impl Location {
    /// Create a location from explicit parts
    #[must_use]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of the caller of the function this is invoked from
    ///
    /// Only meaningful through a chain of `#[track_caller]` functions.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }

    /// Final path component of `file`
    #[must_use]
    pub fn short_file(&self) -> &'static str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A log record - the message plus where it came from
#[derive(Debug, Clone)]
pub struct Record<'a> {
    /// Severity label to write in front of the message; `None` for plain prints
    pub level: Option<Level>,
    /// The log message
    pub message: Cow<'a, str>,
    /// Call site
    pub location: Location,
}

impl<'a> Record<'a> {
    /// Create an unlabeled record
    #[inline]
    pub fn new(message: impl Into<Cow<'a, str>>, location: Location) -> Self {
        Self {
            level: None,
            message: message.into(),
            location,
        }
    }

    /// Builder-style method for attaching a severity label
    #[inline]
    #[must_use]
    pub const fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Message body as written, including the severity label when present
    #[must_use]
    pub fn body(&self) -> Cow<'_, str> {
        match self.level {
            Some(level) => Cow::Owned(format!("{level} {}", self.message)),
            None => Cow::Borrowed(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_file() {
        let location = Location::new("crates/logger/src/record.rs", 7);
        assert_eq!(location.short_file(), "record.rs");
        assert_eq!(Location::new("main.rs", 1).short_file(), "main.rs");
    }

    #[test]
    fn test_caller_points_here() {
        let location = Location::caller();
        assert!(location.file.ends_with("record.rs"));
    }

    #[test]
    fn test_body_label() {
        let here = Location::caller();
        assert_eq!(Record::new("plain", here).body(), "plain");
        assert_eq!(
            Record::new("careful", here).with_level(Level::Warn).body(),
            "warn careful"
        );
    }
}

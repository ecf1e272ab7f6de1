//! Prefix flags controlling what precedes each record

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Bitset selecting the elements written in front of every record
///
/// Rendered in this order: prefix, date, time, file location, message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(u32);

impl Flags {
    /// Nothing but the message
    pub const NONE: Self = Self(0);
    /// Local date: `2009/01/23`
    pub const DATE: Self = Self(1 << 0);
    /// Local time: `01:23:23`
    pub const TIME: Self = Self(1 << 1);
    /// Microsecond resolution: `01:23:23.123123`, implies `TIME`
    pub const MICROSECONDS: Self = Self(1 << 2);
    /// Full file path and line: `/a/b/c/d.rs:23`
    pub const LONG_FILE: Self = Self(1 << 3);
    /// Final file name element and line: `d.rs:23`, overrides `LONG_FILE`
    pub const SHORT_FILE: Self = Self(1 << 4);
    /// Render date and time in UTC rather than the local time zone
    pub const UTC: Self = Self(1 << 5);
    /// Move the textual prefix from the start of the line to just before the message
    pub const MSG_PREFIX: Self = Self(1 << 6);
    /// Date and time
    pub const STD: Self = Self(Self::DATE.0 | Self::TIME.0);

    const ALL_BITS: u32 = (1 << 7) - 1;

    /// Builds flags from raw bits, dropping unknown ones
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    /// Raw bit representation
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no bit is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::STD
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Flags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Flags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & Self::ALL_BITS)
    }
}

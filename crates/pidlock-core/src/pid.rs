//! Process id and pidfile record types.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::SystemTime;

/// A process id as recorded in a pidfile.
///
/// Stored as a signed 32-bit integer to match the platform `pid_t`. The zero
/// value is a sentinel: on write it means "the calling process", on read of a
/// lock it means "nobody holds it".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pid(i32);

impl Pid {
    /// The sentinel pid.
    pub const UNSET: Self = Self(0);

    /// Wrap a raw pid value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw pid value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// The id of the calling process.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // pid_t is a signed 32-bit value
    pub fn current() -> Self {
        Self(std::process::id() as i32)
    }

    /// Returns `false` for the sentinel.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 != 0
    }

    /// Replace the sentinel with the id of the calling process.
    #[must_use]
    pub fn or_current(self) -> Self {
        if self.is_set() { self } else { Self::current() }
    }
}

impl From<i32> for Pid {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pid {
    type Err = ParseIntError;

    /// Parse a signed decimal pid, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(Self)
    }
}

/// A pidfile as read from disk: the recorded pid and the file's mtime.
///
/// Built fresh on every read so it never goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidRecord {
    pub pid: Pid,
    pub modified: SystemTime,
}

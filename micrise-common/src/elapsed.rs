//! Stopwatch value shown next to a rising character
//!
//! An [`Elapsed`] is always derived from a whole `Duration` measured against a
//! fixed start instant. It is never advanced field by field, so a late or
//! skipped refresh cannot make the displayed time drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Elapsed session time split into display fields.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use micrise_common::Elapsed;
///
/// let elapsed = Elapsed::from_duration(Duration::from_millis(83_456));
/// assert_eq!(elapsed.minutes, 1);
/// assert_eq!(elapsed.seconds, 23);
/// assert_eq!(elapsed.hundredths, 45);
/// assert_eq!(elapsed.to_string(), "01:23:45");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Elapsed {
    /// Whole minutes. Does not wrap at the hour.
    pub minutes: u64,
    /// Seconds within the current minute (0-59)
    pub seconds: u8,
    /// Hundredths of a second within the current second (0-99)
    pub hundredths: u8,
}

impl Elapsed {
    /// Zero elapsed time, shown when a session starts
    pub const ZERO: Elapsed = Elapsed {
        minutes: 0,
        seconds: 0,
        hundredths: 0,
    };

    /// Decompose a duration by integer division.
    ///
    /// - `minutes = floor(total_seconds / 60)`
    /// - `seconds = total_seconds mod 60`
    /// - `hundredths = floor((elapsed_ms mod 1000) / 10)`
    pub fn from_duration(duration: Duration) -> Self {
        let total_seconds = duration.as_secs();
        let millis = duration.subsec_millis();

        Self {
            minutes: total_seconds / 60,
            seconds: (total_seconds % 60) as u8,
            hundredths: (millis / 10) as u8,
        }
    }
}

impl From<Duration> for Elapsed {
    fn from(duration: Duration) -> Self {
        Self::from_duration(duration)
    }
}

/// Formats as `MM:SS:HH`, each field zero-padded to two digits.
///
/// Minutes past 99 simply widen the first field.
impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minutes, self.seconds, self.hundredths)
    }
}

//! Session stopwatch
//!
//! Elapsed time is always `now - start` on the monotonic clock, decomposed on
//! demand. Nothing is accumulated per tick, so skipped or late ticks cannot
//! make the reading drift, and wall-clock adjustments have no effect.

use micrise_common::Elapsed;
use tokio::time::Instant;

/// Start instant of a running stopwatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    started: Instant,
}

/// Start a stopwatch now
pub fn start() -> TimerHandle {
    start_at(Instant::now())
}

/// Start a stopwatch at a given instant
pub fn start_at(started: Instant) -> TimerHandle {
    TimerHandle { started }
}

/// Elapsed time since `handle` started, as of now
pub fn elapsed_since(handle: &TimerHandle) -> Elapsed {
    elapsed_at(handle, Instant::now())
}

/// Elapsed time since `handle` started, as of `now`
///
/// Pure in `now`: reading twice with the same instant gives the same value.
/// An instant before the start reads as zero.
pub fn elapsed_at(handle: &TimerHandle, now: Instant) -> Elapsed {
    Elapsed::from_duration(now.saturating_duration_since(handle.started))
}

//! Rise progress: the per-character state machine and the session stopwatch

pub mod controller;
pub mod timer;

pub use controller::{CharacterSnapshot, ProgressController, TickOutcome};
pub use timer::TimerHandle;

//! Threshold-driven rise state machine for one character
//!
//! ```text
//!          begin()                 tick(): position <= max_height
//!   Idle ───────────► Rising ─────────────────────────────────────► Completed
//!    ▲                 │  ▲                                            │
//!    │    cancel()     │  │ tick(): step up or decay toward rest       │
//!    ├─────────────────┘  └────────────────────────────────────────────┤
//!    │                          reset()                                │
//!    └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Heights are measured from the top, so rising means the position value
//! decreases from `min_height` (rest) to `max_height` (goal).

use crate::config::CharacterProfile;
use crate::error::{Error, Result};
use micrise_common::{CharacterId, Elapsed, RiseState};
use serde::Serialize;
use tracing::{debug, trace};

/// Result of one controller tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Controller is not rising; nothing changed and nothing should be emitted
    Inactive,
    /// Still rising at `position`
    Moved { position: f64 },
    /// Goal reached at this tick; the controller is now `Completed`
    Completed { position: f64 },
}

/// Point-in-time view of a character
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSnapshot {
    pub character: CharacterId,
    pub name: String,
    pub state: RiseState,
    pub position: f64,
    pub elapsed: Elapsed,
}

/// Rise state machine for one character
#[derive(Debug, Clone)]
pub struct ProgressController {
    character: CharacterId,
    profile: CharacterProfile,
    volume_threshold: f32,

    state: RiseState,
    position: f64,
    /// Last stopwatch reading recorded by the session driving this controller
    elapsed: Elapsed,
}

impl ProgressController {
    /// Create an idle controller resting at `min_height`
    ///
    /// # Errors
    /// `InvalidConfiguration` for an invalid profile or a negative/non-finite threshold.
    pub fn new(character: CharacterId, profile: CharacterProfile, volume_threshold: f32) -> Result<Self> {
        profile.validate()?;
        if !(volume_threshold.is_finite() && volume_threshold >= 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "volume threshold must be a finite value >= 0, got {}",
                volume_threshold
            )));
        }

        Ok(Self {
            character,
            position: profile.min_height,
            profile,
            volume_threshold,
            state: RiseState::Idle,
            elapsed: Elapsed::ZERO,
        })
    }

    /// Start a rise: `Idle → Rising`, position back to rest, stopwatch zeroed
    ///
    /// # Errors
    /// `InvalidState` unless the controller is `Idle`; a completed controller
    /// must be `reset` first.
    pub fn begin(&mut self) -> Result<()> {
        if self.state != RiseState::Idle {
            return Err(Error::InvalidState {
                operation: "begin",
                state: self.state,
            });
        }

        self.position = self.profile.min_height;
        self.elapsed = Elapsed::ZERO;
        self.state = RiseState::Rising;
        debug!("Character {} ({}) rising from {}", self.character, self.profile.name, self.position);
        Ok(())
    }

    /// Advance one tick using the latest smoothed volume
    ///
    /// A non-finite volume counts as below threshold. Completion is decided
    /// in the same tick that crosses the goal, and the position is clamped
    /// to `max_height`.
    pub fn tick(&mut self, volume: f32) -> TickOutcome {
        if self.state != RiseState::Rising {
            return TickOutcome::Inactive;
        }

        if volume.is_finite() && volume >= self.volume_threshold {
            self.position -= self.profile.step_rate;
        } else if self.position < self.profile.min_height {
            self.position = (self.position + self.profile.decay_rate).min(self.profile.min_height);
        }

        if self.position <= self.profile.max_height {
            self.position = self.profile.max_height;
            self.state = RiseState::Completed;
            debug!("Character {} ({}) reached goal", self.character, self.profile.name);
            return TickOutcome::Completed {
                position: self.position,
            };
        }

        trace!("Character {} tick: volume={:.5}, position={:.4}", self.character, volume, self.position);
        TickOutcome::Moved {
            position: self.position,
        }
    }

    /// Record the stopwatch reading that accompanies the latest tick
    pub fn record_elapsed(&mut self, elapsed: Elapsed) {
        self.elapsed = elapsed;
    }

    /// Stop a running rise: `Rising → Idle`, keeping the current position
    ///
    /// Returns false (and changes nothing) if the controller was not rising.
    pub fn cancel(&mut self) -> bool {
        if self.state != RiseState::Rising {
            return false;
        }
        self.state = RiseState::Idle;
        debug!("Character {} ({}) cancelled at {}", self.character, self.profile.name, self.position);
        true
    }

    /// Return to `Idle` at rest with the stopwatch zeroed, from any state
    pub fn reset(&mut self) {
        self.state = RiseState::Idle;
        self.position = self.profile.min_height;
        self.elapsed = Elapsed::ZERO;
    }

    pub fn character(&self) -> CharacterId {
        self.character
    }

    pub fn profile(&self) -> &CharacterProfile {
        &self.profile
    }

    pub fn state(&self) -> RiseState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn elapsed(&self) -> Elapsed {
        self.elapsed
    }

    pub fn snapshot(&self) -> CharacterSnapshot {
        CharacterSnapshot {
            character: self.character,
            name: self.profile.name.clone(),
            state: self.state,
            position: self.position,
            elapsed: self.elapsed,
        }
    }
}

//! Shared rise state
//!
//! Both character controllers and the "active session" mark live behind one
//! mutex. Every state change and the event that announces it happen inside
//! the same critical section, which is what makes cancellation atomic with
//! respect to ticks: once `cancel_active` returns, a tick from the cancelled
//! session finds the mark gone and emits nothing.
//!
//! The lock is a `std::sync::Mutex`, held only for synchronous work and never
//! across an `.await`.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::rise::{CharacterSnapshot, ProgressController, TickOutcome};
use micrise_common::events::EventBus;
use micrise_common::{CharacterId, Elapsed, RiseEvent, RiseState};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// The session currently allowed to drive a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub session_id: Uuid,
    pub character: CharacterId,
}

/// What a session task should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    /// Still rising; keep ticking
    Continue,
    /// Goal reached during this tick
    Completed,
    /// Session is no longer the active one (cancelled or superseded)
    Stopped,
}

struct RiseBoard {
    /// Indexed by `CharacterId::index()`
    controllers: [ProgressController; 2],
    active: Option<ActiveSession>,
}

/// Shared state accessible by the orchestrator and its session tasks
pub struct SharedState {
    board: Mutex<RiseBoard>,
    events: EventBus,
}

impl SharedState {
    /// Build both controllers from validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        let threshold = config.rise.volume_threshold;
        let controllers = [
            ProgressController::new(CharacterId::A, config.profile(CharacterId::A).clone(), threshold)?,
            ProgressController::new(CharacterId::B, config.profile(CharacterId::B).clone(), threshold)?,
        ];

        Ok(Self {
            board: Mutex::new(RiseBoard {
                controllers,
                active: None,
            }),
            events: EventBus::new(config.rise.event_capacity),
        })
    }

    fn board(&self) -> MutexGuard<'_, RiseBoard> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<RiseEvent> {
        self.events.subscribe()
    }

    /// Current view of one character
    pub fn snapshot(&self, character: CharacterId) -> CharacterSnapshot {
        self.board().controllers[character.index()].snapshot()
    }

    /// Session currently rising, if any
    pub fn active_session(&self) -> Option<ActiveSession> {
        self.board().active
    }

    /// Begin a rise for `character` and mark it active
    ///
    /// A completed controller is reset first. Fails without side effects if
    /// another session is still active or the controller cannot begin.
    pub(crate) fn start_session(&self, character: CharacterId) -> Result<ActiveSession> {
        let mut board = self.board();

        if let Some(active) = board.active {
            return Err(Error::InvalidState {
                operation: "begin a session",
                state: board.controllers[active.character.index()].state(),
            });
        }

        let controller = &mut board.controllers[character.index()];
        if controller.state() == RiseState::Completed {
            controller.reset();
        }
        controller.begin()?;
        let position = controller.position();

        let active = ActiveSession {
            session_id: Uuid::new_v4(),
            character,
        };
        board.active = Some(active);

        self.events.emit_lossy(RiseEvent::SessionStarted {
            character,
            session_id: active.session_id,
            position,
            timestamp: chrono::Utc::now(),
        });
        info!("Session {} started for character {}", active.session_id, character);
        Ok(active)
    }

    /// Cancel whatever session is active
    ///
    /// After this returns, the cancelled session can no longer emit events.
    pub(crate) fn cancel_active(&self) -> Option<ActiveSession> {
        let mut board = self.board();
        let active = board.active.take()?;

        let controller = &mut board.controllers[active.character.index()];
        controller.cancel();

        self.events.emit_lossy(RiseEvent::SessionCancelled {
            character: active.character,
            session_id: active.session_id,
            position: controller.position(),
            elapsed: controller.elapsed(),
            timestamp: chrono::Utc::now(),
        });
        info!(
            "Session {} cancelled for character {} at position {:.3}",
            active.session_id,
            active.character,
            controller.position()
        );
        Some(active)
    }

    /// Run one controller tick for `session_id` and publish the result
    pub(crate) fn apply_tick(&self, session_id: Uuid, volume: f32, elapsed: Elapsed) -> TickFlow {
        let mut board = self.board();
        let Some(active) = board.active.filter(|a| a.session_id == session_id) else {
            return TickFlow::Stopped;
        };

        let controller = &mut board.controllers[active.character.index()];
        let (position, completed) = match controller.tick(volume) {
            TickOutcome::Moved { position } => (position, false),
            TickOutcome::Completed { position } => (position, true),
            TickOutcome::Inactive => {
                // Controller left Rising without going through cancel_active
                board.active = None;
                return TickFlow::Stopped;
            }
        };
        controller.record_elapsed(elapsed);

        self.events.emit_lossy(RiseEvent::ProgressUpdate {
            character: active.character,
            session_id,
            position,
            elapsed,
        });

        if completed {
            board.active = None;
            self.events.emit_lossy(RiseEvent::SessionCompleted {
                character: active.character,
                session_id,
                elapsed,
                timestamp: chrono::Utc::now(),
            });
            info!("Session {} completed for character {} in {}", session_id, active.character, elapsed);
            return TickFlow::Completed;
        }

        TickFlow::Continue
    }

    /// Publish a clip indicator change, if `session_id` is still active
    pub(crate) fn report_clip(&self, session_id: Uuid, clipping: bool) {
        let board = self.board();
        if let Some(active) = board.active.filter(|a| a.session_id == session_id) {
            debug!("Session {} clipping: {}", session_id, clipping);
            self.events.emit_lossy(RiseEvent::ClipStateChanged {
                character: active.character,
                session_id,
                clipping,
            });
        }
    }

    /// Return a character to rest
    ///
    /// # Errors
    /// `InvalidState` if that character is currently rising.
    pub fn reset(&self, character: CharacterId) -> Result<()> {
        let mut board = self.board();
        let controller = &mut board.controllers[character.index()];
        if controller.state() == RiseState::Rising {
            return Err(Error::InvalidState {
                operation: "reset",
                state: RiseState::Rising,
            });
        }
        controller.reset();
        Ok(())
    }
}

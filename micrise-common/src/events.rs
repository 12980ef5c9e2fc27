//! Event types for the MicRise event system
//!
//! Provides the character identity, the rise state enumeration, the
//! [`RiseEvent`] enum consumed by presentation layers, and the [`EventBus`]
//! that carries them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::elapsed::Elapsed;
use crate::error::Error;

/// Identity of one of the two playable characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterId {
    A,
    B,
}

impl CharacterId {
    /// Both characters, in index order
    pub const ALL: [CharacterId; 2] = [CharacterId::A, CharacterId::B];

    /// Stable slot index (A = 0, B = 1)
    pub fn index(self) -> usize {
        match self {
            CharacterId::A => 0,
            CharacterId::B => 1,
        }
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterId::A => write!(f, "a"),
            CharacterId::B => write!(f, "b"),
        }
    }
}

impl FromStr for CharacterId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(CharacterId::A),
            "b" => Ok(CharacterId::B),
            other => Err(Error::InvalidInput(format!(
                "unknown character '{}' (expected 'a' or 'b')",
                other
            ))),
        }
    }
}

/// Rise state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiseState {
    /// Not running; ready for a new session
    #[default]
    Idle,
    /// Session active, position follows the microphone level
    Rising,
    /// Target height reached; terminal until reset
    Completed,
}

impl fmt::Display for RiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiseState::Idle => write!(f, "idle"),
            RiseState::Rising => write!(f, "rising"),
            RiseState::Completed => write!(f, "completed"),
        }
    }
}

/// MicRise event types
///
/// Events are broadcast via [`EventBus`] and serialize with a `type` tag so a
/// presentation layer can consume them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RiseEvent {
    /// A rise session began for a character
    ///
    /// Position has been reset to the character's rest height and the
    /// stopwatch reads zero.
    SessionStarted {
        character: CharacterId,
        session_id: Uuid,
        /// Rest height the session starts from
        position: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Per-tick progress while a session is rising
    ProgressUpdate {
        character: CharacterId,
        session_id: Uuid,
        /// Current display height
        position: f64,
        /// Stopwatch reading at this tick
        elapsed: Elapsed,
    },

    /// Character reached its target height
    ///
    /// Always the last event of a completed session.
    SessionCompleted {
        character: CharacterId,
        session_id: Uuid,
        /// Final stopwatch reading
        elapsed: Elapsed,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session stopped before completion (new session or explicit cancel)
    ///
    /// Always the last event of a cancelled session.
    SessionCancelled {
        character: CharacterId,
        session_id: Uuid,
        /// Height at the moment of cancellation
        position: f64,
        elapsed: Elapsed,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Input overload indicator changed
    ClipStateChanged {
        character: CharacterId,
        session_id: Uuid,
        clipping: bool,
    },
}

impl RiseEvent {
    /// Character the event refers to
    pub fn character(&self) -> CharacterId {
        match self {
            RiseEvent::SessionStarted { character, .. }
            | RiseEvent::ProgressUpdate { character, .. }
            | RiseEvent::SessionCompleted { character, .. }
            | RiseEvent::SessionCancelled { character, .. }
            | RiseEvent::ClipStateChanged { character, .. } => *character,
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            RiseEvent::SessionStarted { session_id, .. }
            | RiseEvent::ProgressUpdate { session_id, .. }
            | RiseEvent::SessionCompleted { session_id, .. }
            | RiseEvent::SessionCancelled { session_id, .. }
            | RiseEvent::ClipStateChanged { session_id, .. } => *session_id,
        }
    }

    /// True for the events that end a session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RiseEvent::SessionCompleted { .. } | RiseEvent::SessionCancelled { .. }
        )
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Wraps a `tokio::sync::broadcast` channel:
/// - Non-blocking publish (slow subscribers don't block the tick loop)
/// - Multiple concurrent subscribers
/// - Lagged subscribers lose the oldest events, never the newest
///
/// At the default 1ms tick a rising session produces about a thousand
/// progress events per second; size the capacity accordingly.
///
/// # Examples
///
/// ```
/// use micrise_common::events::{CharacterId, EventBus, RiseEvent};
///
/// let bus = EventBus::new(64);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(RiseEvent::ClipStateChanged {
///     character: CharacterId::A,
///     session_id: uuid::Uuid::new_v4(),
///     clipping: true,
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(RiseEvent::ClipStateChanged { clipping: true, .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RiseEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RiseEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RiseEvent) {
        let _ = self.tx.send(event);
    }
}

//! Session orchestrator
//!
//! Owns the sample source and the single running session. Beginning a
//! session always tears down the previous one first: there is one input
//! stream and one tick driver, so two sessions can never overlap.

use crate::audio::{LevelMeter, SampleSource};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::rise::{timer, CharacterSnapshot};
use crate::session::runner::SessionRunner;
use crate::state::SharedState;
use micrise_common::{CharacterId, RiseEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handle to the spawned session task
struct RunningSession {
    session_id: Uuid,
    character: CharacterId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Starts, cancels and observes rise sessions
pub struct SessionOrchestrator {
    source: Arc<dyn SampleSource>,
    config: Config,
    state: Arc<SharedState>,
    /// Serialises teardown and startup; never held while waiting on the source
    running: Mutex<Option<RunningSession>>,
    /// Bumped by every begin and cancel; a begin whose ticket is stale by the
    /// time its source is granted gives up
    generation: AtomicU64,
}

impl SessionOrchestrator {
    /// Create an orchestrator with both characters idle at rest
    ///
    /// # Errors
    /// `InvalidConfiguration` if any part of `config` is out of range.
    pub fn new(source: Arc<dyn SampleSource>, config: Config) -> Result<Self> {
        config.validate()?;
        let state = Arc::new(SharedState::new(&config)?);
        info!("Session orchestrator ready (source: {})", source.describe());

        Ok(Self {
            source,
            config,
            state,
            running: Mutex::new(None),
            generation: AtomicU64::new(0),
        })
    }

    /// Start a rise session for `character`
    ///
    /// Any running session is cancelled before the source is requested. If
    /// the source refuses access the error is returned and `character` stays
    /// `Idle` with its position untouched.
    ///
    /// Waiting for the source does not block `cancel_session`. A cancel (or a
    /// newer `begin_session`) issued meanwhile wins: this call then releases
    /// the granted input and returns `Cancelled`.
    pub async fn begin_session(&self, character: CharacterId) -> Result<Uuid> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = self.running.lock().await.take();
        if let Some(previous) = previous {
            self.stop(previous).await;
        }

        let stream = self.source.request_access().await.map_err(|e| {
            warn!("Cannot start session for character {}: {}", character, e);
            e
        })?;
        let meter = LevelMeter::new(self.config.meter)?;

        let mut running = self.running.lock().await;
        if self.generation.load(Ordering::SeqCst) != ticket {
            info!("Start of character {} superseded while acquiring input", character);
            return Err(Error::Cancelled(format!(
                "start of character {} was superseded",
                character
            )));
        }
        if let Some(previous) = running.take() {
            self.stop(previous).await;
        }

        let active = self.state.start_session(character)?;
        let cancel = CancellationToken::new();
        let runner = SessionRunner {
            session_id: active.session_id,
            state: Arc::clone(&self.state),
            stream,
            meter,
            timer: timer::start(),
            tick_interval: self.config.rise.tick_interval(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(runner.run());

        *running = Some(RunningSession {
            session_id: active.session_id,
            character,
            cancel,
            task,
        });
        Ok(active.session_id)
    }

    /// Cancel the running session, if any
    ///
    /// Also supersedes a `begin_session` still waiting for its source.
    /// Returns true if a session was still rising. A session that already
    /// completed is only cleaned up.
    pub async fn cancel_session(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let previous = self.running.lock().await.take();
        match previous {
            Some(previous) => self.stop(previous).await,
            None => false,
        }
    }

    /// Tear down everything (there is at most one session)
    pub async fn cancel_all(&self) {
        self.cancel_session().await;
    }

    async fn stop(&self, session: RunningSession) -> bool {
        // Mark first: from here on the task cannot emit, even mid-tick
        let was_rising = self.state.cancel_active().is_some();
        session.cancel.cancel();

        if let Err(e) = session.task.await {
            error!(
                "Session {} for character {} ended abnormally: {}",
                session.session_id, session.character, e
            );
        }
        was_rising
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<RiseEvent> {
        self.state.subscribe_events()
    }

    /// Current view of one character
    pub fn snapshot(&self, character: CharacterId) -> CharacterSnapshot {
        self.state.snapshot(character)
    }

    /// Id of the session currently rising, if any
    pub fn active_session(&self) -> Option<(Uuid, CharacterId)> {
        self.state
            .active_session()
            .map(|active| (active.session_id, active.character))
    }

    /// Return a character to rest
    ///
    /// # Errors
    /// `InvalidState` if that character is rising.
    pub fn reset(&self, character: CharacterId) -> Result<()> {
        self.state.reset(character)
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        // Cannot await the task here; clearing the mark silences it and the
        // token makes it exit (and release the input) at its next poll
        if let Some(session) = self.running.get_mut().take() {
            self.state.cancel_active();
            session.cancel.cancel();
            debug!("Session {} stopped on orchestrator drop", session.session_id);
        }
    }
}

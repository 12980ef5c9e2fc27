//! Per-session task
//!
//! One task per session consumes both producers: sample blocks from the
//! source stream and ticks from a fixed interval. It owns the level meter,
//! so reading the smoothed volume takes no lock.

use crate::audio::{LevelMeter, SampleStream};
use crate::rise::timer::{self, TimerHandle};
use crate::state::{SharedState, TickFlow};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

pub(crate) struct SessionRunner {
    pub session_id: Uuid,
    pub state: Arc<SharedState>,
    pub stream: SampleStream,
    pub meter: LevelMeter,
    pub timer: TimerHandle,
    pub tick_interval: Duration,
    pub cancel: CancellationToken,
}

impl SessionRunner {
    /// Drive the session until it completes or is cancelled
    ///
    /// Dropping `self` at the end releases the sample stream, which stops
    /// capture for live sources.
    pub(crate) async fn run(mut self) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut source_open = true;
        let mut clipping = false;
        let mut reported_non_finite = 0u64;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("Session {} task cancelled", self.session_id);
                    break;
                }

                _ = ticker.tick() => {
                    // A closed source is silence: the envelope stops being refreshed
                    let volume = if source_open { self.meter.current_volume() } else { 0.0 };

                    let now_clipping = self.meter.is_clipping();
                    if now_clipping != clipping {
                        clipping = now_clipping;
                        self.state.report_clip(self.session_id, clipping);
                    }

                    let elapsed = timer::elapsed_since(&self.timer);
                    match self.state.apply_tick(self.session_id, volume, elapsed) {
                        TickFlow::Continue => {}
                        TickFlow::Completed | TickFlow::Stopped => break,
                    }
                }

                block = self.stream.next_block(), if source_open => match block {
                    Some(block) => {
                        self.meter.process(&block);

                        let non_finite = self.meter.non_finite_samples();
                        if non_finite > reported_non_finite {
                            if reported_non_finite == 0 {
                                warn!(
                                    "Session {}: non-finite samples in input, treating them as silence",
                                    self.session_id
                                );
                            }
                            reported_non_finite = non_finite;
                        }
                    }
                    None => {
                        warn!(
                            "Session {}: {} ended, continuing with silence",
                            self.session_id,
                            self.stream.description()
                        );
                        source_open = false;
                    }
                },
            }
        }

        debug!("Session {} task finished", self.session_id);
    }
}

//! RMS level meter with attack/release smoothing and clip detection
//!
//! Each processed block produces one RMS value. The held volume follows
//! `max(rms, previous * averaging)`: it jumps up immediately on a louder block
//! and decays exponentially through quieter ones.
//!
//! Time is read from `tokio::time::Instant` so clip-hold behaviour follows the
//! runtime clock (and a paused test clock).

use crate::config::MeterConfig;
use crate::error::Result;
use std::time::Duration;
use tokio::time::Instant;

/// Smoothed loudness meter for one input stream
///
/// Owned by a single consumer; `process` and the queries take `&mut self`/`&self`
/// on the same task, so no interior synchronisation is needed.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    clip_level: f32,
    averaging: f32,
    clip_hold: Duration,

    clipping: bool,
    last_clip: Option<Instant>,
    volume: f32,

    /// Non-finite samples seen since construction or reset
    non_finite_samples: u64,
}

impl LevelMeter {
    /// Create a meter, rejecting out-of-range tuning
    ///
    /// # Errors
    /// `InvalidConfiguration` if `averaging ∉ [0, 1)` or `clip_level ∉ (0, 1]`.
    pub fn new(config: MeterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            clip_level: config.clip_level,
            averaging: config.averaging,
            clip_hold: config.clip_hold(),
            clipping: false,
            last_clip: None,
            volume: 0.0,
            non_finite_samples: 0,
        })
    }

    /// Process one block of samples at the current time
    pub fn process(&mut self, block: &[f32]) {
        self.process_at(block, Instant::now());
    }

    /// Process one block of samples observed at `now`
    ///
    /// Empty blocks are ignored. Non-finite samples contribute zero energy
    /// (they still count toward the block length) and never register as clips.
    pub fn process_at(&mut self, block: &[f32], now: Instant) {
        if block.is_empty() {
            return;
        }

        let mut sum = 0.0f64;
        for &x in block {
            if !x.is_finite() {
                self.non_finite_samples += 1;
                continue;
            }
            if x.abs() >= self.clip_level {
                self.clipping = true;
                self.last_clip = Some(now);
            }
            sum += x as f64 * x as f64;
        }

        let rms = (sum / block.len() as f64).sqrt() as f32;
        self.volume = rms.max(self.volume * self.averaging);
    }

    /// Current smoothed volume
    pub fn current_volume(&self) -> f32 {
        self.volume
    }

    /// Whether the input clipped within the hold window, as of now
    pub fn is_clipping(&mut self) -> bool {
        self.is_clipping_at(Instant::now())
    }

    /// Whether the input clipped within the hold window, as of `now`
    ///
    /// The flag clears lazily here once `now - last_clip >= clip_hold`.
    pub fn is_clipping_at(&mut self, now: Instant) -> bool {
        if !self.clipping {
            return false;
        }
        if let Some(last) = self.last_clip {
            if now.saturating_duration_since(last) >= self.clip_hold {
                self.clipping = false;
            }
        }
        self.clipping
    }

    /// Count of non-finite samples discarded so far
    pub fn non_finite_samples(&self) -> u64 {
        self.non_finite_samples
    }

    /// Return to silence with no clip history
    pub fn reset(&mut self) {
        self.clipping = false;
        self.last_clip = None;
        self.volume = 0.0;
        self.non_finite_samples = 0;
    }
}

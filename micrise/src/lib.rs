//! # MicRise (micrise)
//!
//! Microphone-driven rise animation core.
//!
//! **Purpose:** Turn live microphone input into a smoothed loudness level,
//! and move one of two characters from rest toward a goal height while the
//! level stays above a threshold. Progress decays back toward rest in quiet
//! stretches. A stopwatch times each run.
//!
//! **Architecture:** A [`SampleSource`](audio::SampleSource) delivers sample
//! blocks over a channel; a per-session tokio task feeds them through the
//! [`LevelMeter`](audio::LevelMeter) and drives the
//! [`ProgressController`](rise::ProgressController) on a fixed tick. The
//! [`SessionOrchestrator`](session::SessionOrchestrator) keeps at most one
//! session running and publishes [`RiseEvent`](micrise_common::RiseEvent)s on a
//! broadcast channel.

pub mod audio;
pub mod config;
pub mod error;
pub mod rise;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use session::SessionOrchestrator;

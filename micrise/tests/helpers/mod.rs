//! Test helpers for micrise integration tests
//!
//! - Scripted sample sources (constant level, finite burst, pending grant, denied access)
//! - Event collection with lag tolerance
//! - WAV fixture generation

#![allow(dead_code)]

pub mod events;
pub mod sources;
pub mod wav_fixtures;

pub use events::{drain, next_event, wait_for};
pub use sources::{BurstSource, DeniedSource, GatedSource, LevelSource};
pub use wav_fixtures::{write_constant_wav, write_stereo_wav};

use micrise::config::CharacterProfile;
use micrise::Config;
use micrise_common::CharacterId;

/// Default config with an event channel large enough that tests never lag
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.rise.event_capacity = 1 << 16;
    config
}

/// Config where character A completes in `ticks` loud ticks
pub fn quick_config(ticks: u32) -> Config {
    let mut config = test_config();
    let a = CharacterProfile::default_for(CharacterId::A);
    config.characters[0] = CharacterProfile {
        step_rate: (a.min_height - a.max_height) / ticks as f64,
        ..a
    };
    config
}

//! Configuration for micrise
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--config`, `--log-level`, ...)
//! 2. `MICRISE_CONFIG` environment variable naming a TOML file
//! 3. Platform config file (`~/.config/micrise/config.toml`)
//! 4. Built-in defaults (code constants below)
//!
//! Every value is validated once at load. Nothing is reconfigured while a
//! session runs.
//!
//! ```toml
//! [meter]
//! clip_level = 0.98
//! averaging = 0.95
//! clip_hold_ms = 750
//!
//! [rise]
//! volume_threshold = 0.003
//! tick_interval_us = 1000
//!
//! [characters.b]
//! step_rate = 0.02
//! ```

use crate::error::{Error, Result};
use micrise_common::config::{load_toml, resolve_config_path};
use micrise_common::CharacterId;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Level meter tuning
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeterConfig {
    /// Sample magnitude at or above which the input counts as clipping, in (0, 1]
    pub clip_level: f32,
    /// Release coefficient applied to the held volume per block, in [0, 1)
    pub averaging: f32,
    /// How long the clip flag stays up after the last clipping sample
    pub clip_hold_ms: u64,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            clip_level: 0.98,
            averaging: 0.95,
            clip_hold_ms: 750,
        }
    }
}

impl MeterConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.clip_level > 0.0 && self.clip_level <= 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "meter.clip_level must be in (0, 1], got {}",
                self.clip_level
            )));
        }
        if !(self.averaging >= 0.0 && self.averaging < 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "meter.averaging must be in [0, 1), got {}",
                self.averaging
            )));
        }
        Ok(())
    }

    pub fn clip_hold(&self) -> Duration {
        Duration::from_millis(self.clip_hold_ms)
    }
}

/// Rise controller and tick driver settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiseConfig {
    /// Smoothed volume at or above which the character advances
    pub volume_threshold: f32,
    /// Controller tick period in microseconds
    pub tick_interval_us: u64,
    /// Event bus capacity per subscriber
    pub event_capacity: usize,
}

impl Default for RiseConfig {
    fn default() -> Self {
        Self {
            volume_threshold: 0.003,
            tick_interval_us: 1000,
            event_capacity: 1024,
        }
    }
}

impl RiseConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.volume_threshold.is_finite() && self.volume_threshold >= 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "rise.volume_threshold must be a finite value >= 0, got {}",
                self.volume_threshold
            )));
        }
        if self.tick_interval_us == 0 {
            return Err(Error::InvalidConfiguration(
                "rise.tick_interval_us must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "rise.event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us)
    }
}

/// Fixed tuning for one character
///
/// Heights are display units measured from the top, so the goal
/// (`max_height`) is numerically smaller than the rest position
/// (`min_height`).
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterProfile {
    /// Display name
    pub name: String,
    /// Rest position; sessions start here
    pub min_height: f64,
    /// Goal position; reaching it completes the session
    pub max_height: f64,
    /// Per-tick advance while the volume is above threshold
    pub step_rate: f64,
    /// Per-tick retreat toward rest while the volume is below threshold
    pub decay_rate: f64,
}

impl CharacterProfile {
    /// Built-in tuning for each character
    pub fn default_for(id: CharacterId) -> Self {
        match id {
            CharacterId::A => Self {
                name: "minti".to_string(),
                min_height: 63.0,
                max_height: 37.0,
                step_rate: 0.011,
                decay_rate: 0.0025,
            },
            CharacterId::B => Self {
                name: "pipetta".to_string(),
                min_height: 71.0,
                max_height: 40.0,
                step_rate: 0.013,
                decay_rate: 0.0025,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let heights_finite = self.min_height.is_finite() && self.max_height.is_finite();
        if !heights_finite || self.max_height >= self.min_height {
            return Err(Error::InvalidConfiguration(format!(
                "character '{}': max_height ({}) must be below min_height ({})",
                self.name, self.max_height, self.min_height
            )));
        }
        for (field, value) in [("step_rate", self.step_rate), ("decay_rate", self.decay_rate)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfiguration(format!(
                    "character '{}': {} must be a finite value > 0, got {}",
                    self.name, field, value
                )));
            }
        }
        Ok(())
    }
}

/// Partial character section as written in TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CharacterProfileToml {
    name: Option<String>,
    min_height: Option<f64>,
    max_height: Option<f64>,
    step_rate: Option<f64>,
    decay_rate: Option<f64>,
}

impl CharacterProfileToml {
    fn apply_to(self, base: CharacterProfile) -> CharacterProfile {
        CharacterProfile {
            name: self.name.unwrap_or(base.name),
            min_height: self.min_height.unwrap_or(base.min_height),
            max_height: self.max_height.unwrap_or(base.max_height),
            step_rate: self.step_rate.unwrap_or(base.step_rate),
            decay_rate: self.decay_rate.unwrap_or(base.decay_rate),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CharactersToml {
    a: Option<CharacterProfileToml>,
    b: Option<CharacterProfileToml>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Config file layout; every section is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    meter: MeterConfig,
    #[serde(default)]
    rise: RiseConfig,
    #[serde(default)]
    characters: CharactersToml,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Complete, validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub meter: MeterConfig,
    pub rise: RiseConfig,
    /// Indexed by `CharacterId::index()`
    pub characters: [CharacterProfile; 2],
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meter: MeterConfig::default(),
            rise: RiseConfig::default(),
            characters: [
                CharacterProfile::default_for(CharacterId::A),
                CharacterProfile::default_for(CharacterId::B),
            ],
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the config file (see module docs) and load it, or fall back
    /// to defaults when no file exists.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path)? {
            Some(path) => {
                let raw: TomlConfig = load_toml(&path)?;
                let config = Self::from_toml(raw)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => {
                info!("No configuration file, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        Self::from_toml(raw)
    }

    fn from_toml(raw: TomlConfig) -> Result<Self> {
        let mut characters = Self::default().characters;
        if let Some(a) = raw.characters.a {
            characters[0] = a.apply_to(characters[0].clone());
        }
        if let Some(b) = raw.characters.b {
            characters[1] = b.apply_to(characters[1].clone());
        }

        let config = Self {
            meter: raw.meter,
            rise: raw.rise,
            characters,
            logging: raw.logging,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.meter.validate()?;
        self.rise.validate()?;
        for profile in &self.characters {
            profile.validate()?;
        }
        Ok(())
    }

    pub fn profile(&self, id: CharacterId) -> &CharacterProfile {
        &self.characters[id.index()]
    }
}

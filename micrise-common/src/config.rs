//! Configuration file discovery and loading
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MICRISE_CONFIG` environment variable
//! 3. Platform config file, if present
//! 4. None: caller falls back to built-in defaults
//!
//! An explicitly named file (options 1 and 2) must exist. A missing platform
//! file is not an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a TOML config file
pub const CONFIG_ENV_VAR: &str = "MICRISE_CONFIG";

/// Resolve which config file to load, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_existing(path.to_path_buf(), "--config");
    }

    // Priority 2: Environment variable
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return require_existing(PathBuf::from(path), CONFIG_ENV_VAR);
    }

    // Priority 3: Platform config file
    match platform_config_path() {
        Some(path) => {
            info!("Using config file {}", path.display());
            Ok(Some(path))
        }
        None => {
            debug!("No config file found, using built-in defaults");
            Ok(None)
        }
    }
}

fn require_existing(path: PathBuf, origin: &str) -> Result<Option<PathBuf>> {
    if path.is_file() {
        info!("Using config file {} (from {})", path.display(), origin);
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "Config file not found: {} (from {})",
            path.display(),
            origin
        )))
    }
}

/// Existing platform config file, if any
///
/// - Linux: `~/.config/micrise/config.toml`, then `/etc/micrise/config.toml`
/// - macOS / Windows: `<config dir>/micrise/config.toml`
pub fn platform_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("micrise").join("config.toml"));

    if let Some(path) = user_config {
        if path.is_file() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/micrise/config.toml");
        if system_config.is_file() {
            return Some(system_config);
        }
    }

    None
}

/// Read and deserialize a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|source| Error::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

//! Error types for micrise
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use micrise_common::RiseState;
use thiserror::Error;

/// Main error type for the micrise crate
#[derive(Error, Debug)]
pub enum Error {
    /// Sample source could not be opened (no device, permission refused,
    /// stream could not be built). Fatal to the `begin` call that hit it only.
    #[error("Audio input unavailable: {0}")]
    PermissionDenied(String),

    /// Rejected parameter values. Raised at construction, never mid-session.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation not allowed in the controller's current state
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: RiseState,
    },

    /// A session start was superseded while its source was being acquired
    /// (by a cancel or a newer begin). Nothing was started.
    #[error("Session start cancelled: {0}")]
    Cancelled(String),

    /// Audio input device errors after the stream was granted
    #[error("Audio input error: {0}")]
    AudioInput(String),

    /// WAV replay source errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] micrise_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using micrise Error
pub type Result<T> = std::result::Result<T, Error>;

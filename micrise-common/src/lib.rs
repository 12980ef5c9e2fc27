//! # MicRise Common Library
//!
//! Shared code for the MicRise crates including:
//! - Event types (RiseEvent enum) and the character identity
//! - Elapsed-time value and its display formatting
//! - Configuration file discovery
//! - Common error type

pub mod config;
pub mod elapsed;
pub mod error;
pub mod events;

pub use elapsed::Elapsed;
pub use error::{Error, Result};
pub use events::{CharacterId, RiseEvent, RiseState};

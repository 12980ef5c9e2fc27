//! Audio input and level metering
//!
//! - [`meter`]: RMS level meter with attack/release smoothing and clip hold
//! - [`source`]: the `SampleSource` trait and the block stream it yields
//! - [`microphone`]: live input via cpal
//! - [`wav`]: replay of a WAV file as input

pub mod meter;
pub mod microphone;
pub mod source;
pub mod wav;

pub use meter::LevelMeter;
pub use microphone::MicrophoneSource;
pub use source::{SampleBlock, SampleSource, SampleStream};
pub use wav::WavSource;

//! WAV fixture generation

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Mono 16-bit WAV holding `frames` samples of constant `amplitude`
pub fn write_constant_wav(path: &Path, sample_rate: u32, frames: usize, amplitude: f32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    let value = (amplitude * i16::MAX as f32) as i16;
    for _ in 0..frames {
        writer.write_sample(value)?;
    }
    writer.finalize()
}

/// Stereo 32-bit float WAV with different constant levels per channel
pub fn write_stereo_wav(path: &Path, sample_rate: u32, frames: usize, left: f32, right: f32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frames {
        writer.write_sample(left)?;
        writer.write_sample(right)?;
    }
    writer.finalize()
}

//! WAV file replay as a sample source
//!
//! Decodes a WAV file with hound and replays channel 0 in fixed-size blocks at
//! the file's own sample rate, paced by a tokio interval. Lets a session run
//! from a recording instead of a live microphone.

use crate::audio::microphone::DEFAULT_BLOCK_FRAMES;
use crate::audio::source::{first_channel_blocks, SampleBlock, SampleSource, SampleStream, DEFAULT_STREAM_CAPACITY};
use crate::error::{Error, Result};
use async_trait::async_trait;
use hound::{SampleFormat, WavReader};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Replays a WAV file as if it were live input
#[derive(Debug, Clone)]
pub struct WavSource {
    path: PathBuf,
    block_frames: usize,
}

impl WavSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_frames: DEFAULT_BLOCK_FRAMES,
        }
    }

    pub fn with_block_frames(mut self, block_frames: usize) -> Self {
        self.block_frames = block_frames.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decoded file contents ready for replay
#[derive(Debug)]
pub(crate) struct DecodedWav {
    pub sample_rate: u32,
    pub blocks: Vec<SampleBlock>,
}

/// Decode `path` into channel-0 blocks of `block_frames` samples
///
/// Integer formats are scaled to [-1.0, 1.0) by their bit depth.
pub(crate) fn decode_wav(path: &Path, block_frames: usize) -> Result<DecodedWav> {
    let reader = WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) if matches!(io.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            Error::PermissionDenied(format!("Cannot open {}: {}", path.display(), io))
        }
        other => Error::Wav(other),
    })?;

    let spec = reader.spec();
    debug!(
        "WAV format: {}Hz, {} channel(s), {} bits, {:?}",
        spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?
        }
    };

    Ok(DecodedWav {
        sample_rate: spec.sample_rate,
        blocks: first_channel_blocks(&interleaved, spec.channels as usize, block_frames),
    })
}

#[async_trait]
impl SampleSource for WavSource {
    async fn request_access(&self) -> Result<SampleStream> {
        let path = self.path.clone();
        let block_frames = self.block_frames;
        let decoded = tokio::task::spawn_blocking(move || decode_wav(&path, block_frames))
            .await
            .map_err(|e| Error::AudioInput(format!("WAV decode task failed: {}", e)))??;

        let sample_rate = decoded.sample_rate.max(1);
        let period = Duration::from_secs_f64(block_frames as f64 / sample_rate as f64);
        info!(
            "Replaying {} ({} blocks, {:.1}ms per block)",
            self.path.display(),
            decoded.blocks.len(),
            period.as_secs_f64() * 1000.0
        );

        let (tx, stream) = SampleStream::channel(DEFAULT_STREAM_CAPACITY, self.describe());
        tokio::spawn(async move {
            let mut pacing = interval(period);
            pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for block in decoded.blocks {
                pacing.tick().await;
                if tx.send(block).await.is_err() {
                    debug!("WAV replay stopped: stream released");
                    return;
                }
            }
            debug!("WAV replay finished");
        });

        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("wav '{}'", self.path.display())
    }
}

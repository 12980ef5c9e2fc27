//! Sample source abstraction
//!
//! A [`SampleSource`] hands out a [`SampleStream`]: a channel of mono sample
//! blocks filled by whatever drives the input (an audio callback, a file
//! replay task, a test). Dropping the stream releases the input.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One block of mono samples in [-1.0, 1.0]
pub type SampleBlock = Vec<f32>;

/// Default number of blocks buffered between producer and meter
///
/// At 512 frames / 44.1kHz this is roughly 0.75s of audio. A producer that
/// finds the channel full drops the block rather than waiting.
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// Provider of audio input
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Acquire the input and start delivering blocks
    ///
    /// This is the only operation that may wait on the outside world (a
    /// device or permission grant). It resolves to a ready stream or fails.
    ///
    /// # Errors
    /// `PermissionDenied` when the input cannot be opened.
    async fn request_access(&self) -> Result<SampleStream>;

    /// Human-readable name for logs
    fn describe(&self) -> String;
}

/// Receiving end of an acquired input
///
/// Owns the block channel and, for hardware inputs, a stop flag that is
/// raised when the stream is dropped.
pub struct SampleStream {
    blocks: mpsc::Receiver<SampleBlock>,
    description: String,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl SampleStream {
    /// Create a stream and the sender a producer pushes blocks into
    pub fn channel(
        capacity: usize,
        description: impl Into<String>,
    ) -> (mpsc::Sender<SampleBlock>, SampleStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stream = SampleStream {
            blocks: rx,
            description: description.into(),
            stop_flag: None,
        };
        (tx, stream)
    }

    /// Raise `flag` when this stream is dropped
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    /// Wait for the next block; `None` once the producer has finished
    pub async fn next_block(&mut self) -> Option<SampleBlock> {
        self.blocks.recv().await
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for SampleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleStream")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Drop for SampleStream {
    fn drop(&mut self) {
        if let Some(flag) = &self.stop_flag {
            flag.store(true, Ordering::Release);
        }
    }
}

/// Fold interleaved frames down to channel 0, split into blocks of `block_frames`
///
/// Only the first channel of each frame is kept. A trailing partial block is
/// returned as-is.
pub fn first_channel_blocks(interleaved: &[f32], channels: usize, block_frames: usize) -> Vec<SampleBlock> {
    let channels = channels.max(1);
    let block_frames = block_frames.max(1);

    let mono: Vec<f32> = interleaved.chunks(channels).map(|frame| frame[0]).collect();
    mono.chunks(block_frames).map(|c| c.to_vec()).collect()
}

//! Microphone input using cpal
//!
//! The cpal stream is created and owned by a dedicated capture thread (cpal
//! streams are not `Send`). The callback folds frames to channel 0, cuts them
//! into fixed-size blocks and pushes them into the session's block channel.
//! The thread releases the device once the stream handle is dropped.

use crate::audio::source::{SampleBlock, SampleSource, SampleStream, DEFAULT_STREAM_CAPACITY};
use crate::error::{Error, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

/// Frames per block handed to the level meter
pub const DEFAULT_BLOCK_FRAMES: usize = 512;

/// How often the capture thread checks whether the stream was released
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Negotiated input parameters, reported once the stream is running
#[derive(Debug, Clone)]
pub struct InputInfo {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

/// Live microphone input
#[derive(Debug, Clone)]
pub struct MicrophoneSource {
    /// Requested device (None = default input device)
    device_name: Option<String>,
    block_frames: usize,
    capacity: usize,
}

impl MicrophoneSource {
    /// Capture from the named input device, or the default one
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            block_frames: DEFAULT_BLOCK_FRAMES,
            capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Override the block size delivered to the meter
    pub fn with_block_frames(mut self, block_frames: usize) -> Self {
        self.block_frames = block_frames.max(1);
        self
    }

    /// List available audio input devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .input_devices()
            .map_err(|e| Error::AudioInput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} input devices", devices.len());
        Ok(devices)
    }

    /// Find the requested device, falling back to the default input
    fn open_device(device_name: Option<&str>) -> Result<(Device, String)> {
        let host = cpal::default_host();

        if let Some(name) = device_name {
            let mut devices = host
                .input_devices()
                .map_err(|e| Error::PermissionDenied(format!("Failed to enumerate devices: {}", e)))?;

            if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                info!("Found requested input device: {}", name);
                return Ok((dev, name.to_string()));
            }
            warn!("Requested input device '{}' not found, falling back to default device", name);
        }

        let dev = host
            .default_input_device()
            .ok_or_else(|| Error::PermissionDenied("No input device available".to_string()))?;
        let name = dev.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using default input device: {}", name);
        Ok((dev, name))
    }
}

#[async_trait]
impl SampleSource for MicrophoneSource {
    async fn request_access(&self) -> Result<SampleStream> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<InputInfo>>();
        // From here on, dropping `stream` on any path releases the device
        let (block_tx, stream, thread_stop) = capture_channel(self.capacity, self.describe());

        let device_name = self.device_name.clone();
        let block_frames = self.block_frames;

        std::thread::Builder::new()
            .name("micrise-capture".to_string())
            .spawn(move || {
                capture_thread(device_name, block_frames, block_tx, thread_stop, ready_tx)
            })
            .map_err(|e| Error::AudioInput(format!("Failed to spawn capture thread: {}", e)))?;

        match ready_rx.await {
            Ok(Ok(input)) => {
                info!(
                    "Microphone capture started: {} @ {}Hz, {} channel(s), {:?}",
                    input.device_name, input.sample_rate, input.channels, input.sample_format
                );
                Ok(stream)
            }
            Ok(Err(e)) => {
                warn!("Microphone access failed: {}", e);
                Err(e)
            }
            Err(_) => Err(Error::PermissionDenied(
                "Capture thread exited before the input opened".to_string(),
            )),
        }
    }

    fn describe(&self) -> String {
        match &self.device_name {
            Some(name) => format!("microphone '{}'", name),
            None => "default microphone".to_string(),
        }
    }
}

/// Block channel whose receiving end raises the returned stop flag when dropped
fn capture_channel(
    capacity: usize,
    description: String,
) -> (mpsc::Sender<SampleBlock>, SampleStream, Arc<AtomicBool>) {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let (block_tx, stream) = SampleStream::channel(capacity, description);
    (block_tx, stream.with_stop_flag(Arc::clone(&stop_flag)), stop_flag)
}

/// Body of the capture thread: open, report readiness, hold until released
fn capture_thread(
    device_name: Option<String>,
    block_frames: usize,
    block_tx: mpsc::Sender<SampleBlock>,
    stop_flag: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<InputInfo>>,
) {
    let (stream, input) = match open_input_stream(device_name.as_deref(), block_frames, block_tx) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(Error::PermissionDenied(format!(
            "Failed to start input stream: {}",
            e
        ))));
        return;
    }

    if ready_tx.send(Ok(input)).is_err() {
        // Requester went away while we were opening the device
        return;
    }

    while !stop_flag.load(Ordering::Acquire) {
        std::thread::sleep(STOP_POLL_INTERVAL);
    }

    drop(stream);
    info!("Microphone capture stopped");
}

fn open_input_stream(
    device_name: Option<&str>,
    block_frames: usize,
    block_tx: mpsc::Sender<SampleBlock>,
) -> Result<(Stream, InputInfo)> {
    let (device, name) = MicrophoneSource::open_device(device_name)?;

    let supported = device
        .default_input_config()
        .map_err(|e| Error::PermissionDenied(format!("Failed to get input config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();

    debug!(
        "Input config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
        config.sample_rate.0, config.channels, sample_format, config.buffer_size
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, block_frames, block_tx)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, block_frames, block_tx)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, block_frames, block_tx)?,
        other => {
            return Err(Error::PermissionDenied(format!(
                "Unsupported input sample format: {:?}",
                other
            )));
        }
    };

    let input = InputInfo {
        device_name: name,
        sample_rate: config.sample_rate.0,
        channels: config.channels,
        sample_format,
    };
    Ok((stream, input))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    block_frames: usize,
    block_tx: mpsc::Sender<SampleBlock>,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let mut pending: Vec<f32> = Vec::with_capacity(block_frames * 2);
    let mut dropped_blocks: u64 = 0;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                pending.extend(data.chunks(channels).map(|frame| frame[0].to_sample::<f32>()));

                while pending.len() >= block_frames {
                    let block: SampleBlock = pending.drain(..block_frames).collect();
                    if block_tx.try_send(block).is_err() {
                        // Meter is behind or the session ended; older level data is fine
                        dropped_blocks += 1;
                        if dropped_blocks.is_power_of_two() {
                            trace!("Dropped {} input blocks", dropped_blocks);
                        }
                    }
                }
            },
            |err| error!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|e| Error::PermissionDenied(format!("Failed to build input stream: {}", e)))
}

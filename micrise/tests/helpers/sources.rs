//! Scripted sample sources

use async_trait::async_trait;
use micrise::audio::{SampleSource, SampleStream};
use micrise::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{interval, MissedTickBehavior};

/// Period between blocks from [`LevelSource`]
pub const BLOCK_PERIOD: Duration = Duration::from_millis(5);
const BLOCK_LEN: usize = 256;

/// Source producing constant-amplitude blocks at a fixed cadence
///
/// The amplitude can be changed while a session runs; every stream handed
/// out follows the latest value. Access can be switched to denied.
pub struct LevelSource {
    level: watch::Sender<f32>,
    denied: AtomicBool,
    grants: AtomicUsize,
}

impl LevelSource {
    pub fn new(level: f32) -> Self {
        let (level, _) = watch::channel(level);
        Self {
            level,
            denied: AtomicBool::new(false),
            grants: AtomicUsize::new(0),
        }
    }

    pub fn set_level(&self, level: f32) {
        self.level.send_replace(level);
    }

    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Number of streams handed out so far
    pub fn grants(&self) -> usize {
        self.grants.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleSource for LevelSource {
    async fn request_access(&self) -> Result<SampleStream> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(Error::PermissionDenied("test source: access refused".to_string()));
        }
        self.grants.fetch_add(1, Ordering::SeqCst);

        let mut level = self.level.subscribe();
        let (tx, stream) = SampleStream::channel(8, self.describe());
        tokio::spawn(async move {
            let mut ticker = interval(BLOCK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let amplitude = *level.borrow_and_update();
                if tx.send(vec![amplitude; BLOCK_LEN]).await.is_err() {
                    break;
                }
            }
        });
        Ok(stream)
    }

    fn describe(&self) -> String {
        "test level source".to_string()
    }
}

/// Source that delivers a fixed set of blocks, then ends
pub struct BurstSource {
    blocks: Vec<Vec<f32>>,
}

impl BurstSource {
    pub fn new(blocks: Vec<Vec<f32>>) -> Self {
        Self { blocks }
    }
}

#[async_trait]
impl SampleSource for BurstSource {
    async fn request_access(&self) -> Result<SampleStream> {
        let (tx, stream) = SampleStream::channel(self.blocks.len() + 1, self.describe());
        for block in &self.blocks {
            tx.send(block.clone())
                .await
                .map_err(|e| Error::AudioInput(e.to_string()))?;
        }
        Ok(stream)
    }

    fn describe(&self) -> String {
        "test burst source".to_string()
    }
}

/// Source that never grants access
pub struct DeniedSource;

#[async_trait]
impl SampleSource for DeniedSource {
    async fn request_access(&self) -> Result<SampleStream> {
        Err(Error::PermissionDenied("microphone permission refused".to_string()))
    }

    fn describe(&self) -> String {
        "denied source".to_string()
    }
}

/// Source whose access grant waits until [`GatedSource::grant`] is called
///
/// Models a pending permission prompt. Granted streams carry silence.
pub struct GatedSource {
    gate: Notify,
    requests: AtomicUsize,
}

impl GatedSource {
    pub fn new() -> Self {
        Self {
            gate: Notify::new(),
            requests: AtomicUsize::new(0),
        }
    }

    /// Let one pending (or the next) request through
    pub fn grant(&self) {
        self.gate.notify_one();
    }

    /// Number of requests that have started waiting
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleSource for GatedSource {
    async fn request_access(&self) -> Result<SampleStream> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;

        let (tx, stream) = SampleStream::channel(8, self.describe());
        tokio::spawn(async move {
            let mut ticker = interval(BLOCK_PERIOD);
            loop {
                ticker.tick().await;
                if tx.send(vec![0.0; BLOCK_LEN]).await.is_err() {
                    break;
                }
            }
        });
        Ok(stream)
    }

    fn describe(&self) -> String {
        "gated test source".to_string()
    }
}

//! MicRise - Main entry point
//!
//! Runs one rise session from the microphone (or a WAV file) and shows its
//! progress on the terminal until the character reaches the goal or the
//! user presses Ctrl+C.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use micrise::audio::microphone::DEFAULT_BLOCK_FRAMES;
use micrise::audio::{MicrophoneSource, SampleSource, WavSource};
use micrise::config::CharacterProfile;
use micrise::{Config, SessionOrchestrator};
use micrise_common::{CharacterId, Elapsed, RiseEvent};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

const BAR_WIDTH: usize = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for micrise
#[derive(Parser, Debug)]
#[command(name = "micrise")]
#[command(about = "Make a character rise by making noise")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "MICRISE_CONFIG")]
    config: Option<PathBuf>,

    /// Character to raise (a or b)
    #[arg(short = 'C', long, default_value = "a")]
    character: CharacterId,

    /// Replay a WAV file instead of capturing from a microphone
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Input device name (default device if omitted or not found)
    #[arg(short, long, env = "MICRISE_DEVICE")]
    device: Option<String>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Print events as JSON lines instead of a status line
    #[arg(long)]
    json: bool,

    /// Frames per block fed to the level meter
    #[arg(long, default_value_t = DEFAULT_BLOCK_FRAMES)]
    block_frames: usize,

    /// Minimum time between progress redraws, in milliseconds
    #[arg(long, default_value = "50")]
    refresh_ms: u64,

    /// Log level or filter directive (overrides the config file)
    #[arg(long, env = "MICRISE_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Start logging before the config file is read so its messages are kept;
    // the file's level takes over once loaded unless RUST_LOG or --log-level set one
    let env_filter = EnvFilter::try_from_default_env().ok();
    let pinned = env_filter.is_some() || args.log_level.is_some();
    let bootstrap = env_filter.unwrap_or_else(|| {
        log_filter(args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))
    });
    let (filter, filter_handle) = reload::Layer::new(bootstrap);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if !pinned {
        if let Err(e) = filter_handle.reload(log_filter(&config.logging.level)) {
            warn!("Could not apply configured log level: {}", e);
        }
    }

    if args.list_devices {
        let devices = MicrophoneSource::list_devices().context("Failed to enumerate input devices")?;
        let mut out = std::io::stdout().lock();
        for name in devices {
            writeln!(out, "{}", name)?;
        }
        return Ok(());
    }

    let source: Arc<dyn SampleSource> = match &args.input {
        Some(path) => Arc::new(WavSource::new(path).with_block_frames(args.block_frames)),
        None => Arc::new(MicrophoneSource::new(args.device.clone()).with_block_frames(args.block_frames)),
    };

    let profile = config.profile(args.character).clone();
    let orchestrator = SessionOrchestrator::new(source, config).context("Invalid configuration")?;
    let mut events = orchestrator.subscribe();

    let session_id = orchestrator
        .begin_session(args.character)
        .await
        .context("Failed to start session")?;
    info!("Raising {} (session {})", profile.name, session_id);

    let mut view = StatusView::new(profile, args.json, Duration::from_millis(args.refresh_ms));
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if event.session_id() != session_id {
                        continue;
                    }
                    view.show(&event)?;
                    if event.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Display fell behind, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received Ctrl+C, cancelling session"),
                    Err(e) => warn!("Ctrl+C handler failed: {}, cancelling session", e),
                }
                // The SessionCancelled event ends the loop
                if !orchestrator.cancel_session().await {
                    break;
                }
            }
        }
    }

    orchestrator.cancel_all().await;
    info!("Shutdown complete");
    Ok(())
}

/// Filter for a bare level ("debug") or a full directive ("micrise=trace,cpal=warn")
fn log_filter(level: &str) -> EnvFilter {
    let directive = if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("micrise={level},micrise_common={level}")
    };
    EnvFilter::new(directive)
}

/// Terminal rendering of one session's events
struct StatusView {
    profile: CharacterProfile,
    json: bool,
    refresh: Duration,
    last_draw: Option<Instant>,
    clipping: bool,
}

impl StatusView {
    fn new(profile: CharacterProfile, json: bool, refresh: Duration) -> Self {
        Self {
            profile,
            json,
            refresh,
            last_draw: None,
            clipping: false,
        }
    }

    fn show(&mut self, event: &RiseEvent) -> Result<()> {
        if let RiseEvent::ClipStateChanged { clipping, .. } = event {
            self.clipping = *clipping;
        }

        // Progress arrives every tick; everything else is always shown
        if let RiseEvent::ProgressUpdate { .. } = event {
            let now = Instant::now();
            if self.last_draw.is_some_and(|last| now.duration_since(last) < self.refresh) {
                return Ok(());
            }
            self.last_draw = Some(now);
        }

        let mut out = std::io::stdout().lock();
        if self.json {
            writeln!(out, "{}", serde_json::to_string(event)?)?;
            return Ok(());
        }

        match event {
            RiseEvent::SessionStarted { position, .. } => {
                self.draw(&mut out, *position, Elapsed::ZERO)?;
            }
            RiseEvent::ProgressUpdate { position, elapsed, .. } => {
                self.draw(&mut out, *position, *elapsed)?;
            }
            RiseEvent::SessionCompleted { elapsed, .. } => {
                self.draw(&mut out, self.profile.max_height, *elapsed)?;
                writeln!(out)?;
                writeln!(out, "{} reached the top in {}", self.profile.name, elapsed)?;
            }
            RiseEvent::SessionCancelled { position, elapsed, .. } => {
                self.draw(&mut out, *position, *elapsed)?;
                writeln!(out)?;
                writeln!(out, "{} stopped at {:.2} after {}", self.profile.name, position, elapsed)?;
            }
            RiseEvent::ClipStateChanged { .. } => {}
        }
        out.flush()?;
        Ok(())
    }

    fn draw(&self, out: &mut impl Write, position: f64, elapsed: Elapsed) -> std::io::Result<()> {
        let span = self.profile.min_height - self.profile.max_height;
        let fraction = ((self.profile.min_height - position) / span).clamp(0.0, 1.0);
        let filled = (fraction * BAR_WIDTH as f64).round() as usize;

        write!(
            out,
            "\r{:<10} [{}{}] {:6.2} {}{}",
            self.profile.name,
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            position,
            elapsed,
            if self.clipping { "  CLIP" } else { "      " }
        )
    }
}

//! Session orchestration: first pair, two workers, bounded shutdown.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, trace, warn};

use super::stats::{SessionStats, StatsSnapshot};
use crate::capture::CaptureSource;
use crate::config::CaptureSessionConfig;
use crate::error::{FrameError, SessionError};
use crate::output::ActivePair;
use crate::rotation::FileRotator;
use crate::sink::PacketSink;

const INGEST_JOIN_TIMEOUT: Duration = Duration::from_secs(5);
const ROTATE_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
const ROTATION_TICK: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called
    Requested,
    /// The capture source ran out of frames
    SourceExhausted,
    /// The capture source failed
    SourceFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "stop requested"),
            Self::SourceExhausted => write!(f, "capture source exhausted"),
            Self::SourceFailed(msg) => write!(f, "capture source failed: {}", msg),
        }
    }
}

/// State shared with the workers so either side can end the session.
#[derive(Clone)]
struct Shutdown {
    running: Arc<AtomicBool>,
    active: ActivePair,
    reason: Arc<Mutex<Option<StopReason>>>,
}

impl Shutdown {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Record the first reason only.
    fn record(&self, reason: StopReason) {
        let mut slot = self.reason.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(reason);
        }
    }

    /// Stop from inside a worker: clear the flag and close the active pair.
    fn trigger(&self, reason: StopReason) {
        self.record(reason);
        self.running.store(false, Ordering::SeqCst);
        self.active.close();
    }
}

/// A capture session writing rotating pcap/JSONL pairs.
///
/// While running, an ingestion worker feeds frames from the capture source
/// into a [`PacketSink`] and a rotation worker ticks a [`FileRotator`] once a
/// second. Both share the active pair through one lock.
///
/// Dropping a running session stops it.
pub struct CaptureSession {
    config: Option<CaptureSessionConfig>,
    shutdown: Shutdown,
    stats: Arc<SessionStats>,
    ingest: Option<JoinHandle<()>>,
    rotate: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            config: None,
            shutdown: Shutdown {
                running: Arc::new(AtomicBool::new(false)),
                active: ActivePair::new(),
                reason: Arc::new(Mutex::new(None)),
            },
            stats: Arc::new(SessionStats::new()),
            ingest: None,
            rotate: None,
        }
    }

    /// Open the first pair and launch both workers.
    ///
    /// Returns once the workers are running. Errors opening the output
    /// directory or the first pair are returned here; later failures are
    /// logged and end the session on their own.
    pub fn start(
        &mut self,
        config: CaptureSessionConfig,
        mut source: Box<dyn CaptureSource>,
    ) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        // Reap the workers of a session that ended itself.
        self.stop();

        config.validate()?;
        std::fs::create_dir_all(&config.out_dir).map_err(|source| SessionError::OutputDir {
            path: config.out_dir.clone(),
            source,
        })?;

        // Fresh shared state, so a detached worker of an earlier run can never
        // touch this one.
        let shutdown = Shutdown {
            running: Arc::new(AtomicBool::new(true)),
            active: ActivePair::new(),
            reason: Arc::new(Mutex::new(None)),
        };
        let stats = Arc::new(SessionStats::new());

        let rotator = FileRotator::new(
            &config,
            shutdown.active.clone(),
            Arc::clone(&shutdown.running),
            Arc::clone(&stats),
        );
        if let Err(e) = rotator.maybe_rotate(Utc::now()) {
            shutdown.running.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        self.shutdown = shutdown;
        self.stats = Arc::clone(&stats);

        source.set_running(Arc::clone(&self.shutdown.running));
        let sink = PacketSink::new(
            &config.interface,
            config.metadata,
            self.shutdown.active.clone(),
            stats,
        );

        let ingest_shutdown = self.shutdown.clone();
        self.ingest = Some(self.spawn_worker("rotocap-ingest", move || {
            run_ingestion(source, sink, ingest_shutdown)
        })?);

        let running = Arc::clone(&self.shutdown.running);
        self.rotate = Some(self.spawn_worker("rotocap-rotate", move || {
            run_rotation(rotator, running)
        })?);

        info!(
            "Capture session started on {} (rotate every {}s, keep {} pairs, metadata {})",
            config.interface,
            config.rotate_interval.as_secs(),
            config.max_pairs,
            if config.metadata { "on" } else { "off" }
        );
        self.config = Some(config);
        Ok(())
    }

    /// Stop both workers and close the active pair. Safe to call repeatedly.
    ///
    /// Each worker gets a bounded wait; one that does not exit in time is
    /// detached and logged. No files are written after this returns.
    pub fn stop(&mut self) {
        if self.ingest.is_none() && self.rotate.is_none() && !self.shutdown.active.is_open() {
            return;
        }

        info!("Stopping collector...");
        self.shutdown.record(StopReason::Requested);
        self.shutdown.running.store(false, Ordering::SeqCst);

        join_bounded(self.ingest.take(), INGEST_JOIN_TIMEOUT, "Ingestion");
        join_bounded(self.rotate.take(), ROTATE_JOIN_TIMEOUT, "Rotation");

        self.shutdown.active.close();

        let stats = self.stats.snapshot();
        info!(
            "Collector stopped: {} frames written, {} dropped, {} failed, {} pairs",
            stats.frames_written, stats.frames_dropped, stats.frames_failed, stats.pairs_opened
        );
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Config of the current or most recent run.
    pub fn config(&self) -> Option<&CaptureSessionConfig> {
        self.config.as_ref()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Why the current or most recent run ended, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.shutdown
            .reason
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Basename of the pair currently receiving frames.
    pub fn active_basename(&self) -> Option<String> {
        self.shutdown
            .active
            .lock()
            .as_ref()
            .map(|pair| pair.basename().to_string())
    }

    fn spawn_worker<F>(&mut self, name: &str, f: F) -> Result<JoinHandle<()>, SessionError>
    where
        F: FnOnce() + Send + 'static,
    {
        match thread::Builder::new().name(name.to_string()).spawn(f) {
            Ok(handle) => Ok(handle),
            Err(e) => {
                error!("Failed to spawn {} worker: {}", name, e);
                self.stop();
                Err(SessionError::Spawn(e))
            }
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_ingestion(mut source: Box<dyn CaptureSource>, sink: PacketSink, shutdown: Shutdown) {
    let interface = source.interface_name().to_string();
    debug!("Ingestion worker started on {}", interface);

    let frames = match source.frames() {
        Ok(frames) => frames,
        Err(e) => {
            error!("Sniffer error on {}: {}", interface, e);
            shutdown.trigger(StopReason::SourceFailed(e.to_string()));
            return;
        }
    };

    for item in frames {
        if !shutdown.is_running() {
            break;
        }
        match item {
            Ok(frame) => match sink.handle_frame(&frame) {
                Ok(()) => {}
                Err(FrameError::NoActivePair) => trace!("Frame dropped, no active pair"),
                Err(e) => warn!("Skipping frame: {}", e),
            },
            Err(e) => {
                error!("Sniffer error on {}: {}", interface, e);
                shutdown.trigger(StopReason::SourceFailed(e.to_string()));
                return;
            }
        }
    }

    if shutdown.is_running() {
        info!("Capture source on {} exhausted, shutting down", interface);
        shutdown.trigger(StopReason::SourceExhausted);
    }
    debug!("Ingestion worker exiting");
}

fn run_rotation(rotator: FileRotator, running: Arc<AtomicBool>) {
    debug!("Rotation worker started");
    while running.load(Ordering::SeqCst) {
        if let Err(e) = rotator.maybe_rotate(Utc::now()) {
            error!("Failed to open new capture pair, retrying next tick: {}", e);
        }
        sleep_while_running(&running, ROTATION_TICK);
    }
    debug!("Rotation worker exiting");
}

fn sleep_while_running(running: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}

fn join_bounded(handle: Option<JoinHandle<()>>, timeout: Duration, name: &str) {
    let Some(handle) = handle else {
        return;
    };

    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            error!(
                "{} worker did not exit within {:?}, detaching it",
                name, timeout
            );
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if handle.join().is_err() {
        error!("{} worker panicked", name);
    }
}

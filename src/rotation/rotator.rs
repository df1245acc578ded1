//! Age-based rotation of the active pair.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::retention::RetentionEnforcer;
use crate::config::CaptureSessionConfig;
use crate::error::OutputError;
use crate::output::{close_pair, ActivePair, OutputPair};
use crate::session::SessionStats;

/// Decides on each tick whether the active pair is due for replacement.
pub struct FileRotator {
    out_dir: PathBuf,
    rotate_interval: Duration,
    metadata: bool,
    active: ActivePair,
    running: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
    retention: RetentionEnforcer,
}

impl FileRotator {
    pub fn new(
        config: &CaptureSessionConfig,
        active: ActivePair,
        running: Arc<AtomicBool>,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            out_dir: config.out_dir.clone(),
            rotate_interval: config.rotate_interval,
            metadata: config.metadata,
            active,
            running,
            stats,
            retention: RetentionEnforcer::new(config.out_dir.clone(), config.max_pairs),
        }
    }

    /// Rotate if no pair is open or the open one is at least `rotate_interval` old.
    ///
    /// Returns `Ok(true)` when a new pair was opened. On an open failure the
    /// session is left without an active pair and the next tick retries.
    /// A pair that is not yet due is flushed instead.
    pub fn maybe_rotate(&self, now: DateTime<Utc>) -> Result<bool, OutputError> {
        {
            let mut guard = self.active.lock();

            // Checked under the lock so a stopping session never gets a new pair.
            if !self.running.load(Ordering::SeqCst) {
                return Ok(false);
            }

            if let Some(pair) = guard.as_mut() {
                if !self.is_due(pair, now) {
                    if let Err(e) = pair.flush() {
                        warn!("Failed to flush capture pair {}: {}", pair.basename(), e);
                    }
                    return Ok(false);
                }
                debug!("Capture pair {} reached its age limit", pair.basename());
            }

            if let Some(old) = guard.take() {
                close_pair(old);
            }

            let pair = OutputPair::open(&self.out_dir, now, self.metadata)?;
            info!("Opened capture pair {}", pair.basename());
            *guard = Some(pair);
            self.stats.record_pair_opened();
        }

        // Retention only touches closed pairs, so it runs outside the lock.
        self.retention.enforce();
        Ok(true)
    }

    fn is_due(&self, pair: &OutputPair, now: DateTime<Utc>) -> bool {
        // A clock that stepped backwards yields a negative age: not due.
        (now - pair.created_at())
            .to_std()
            .map_or(false, |age| age >= self.rotate_interval)
    }
}

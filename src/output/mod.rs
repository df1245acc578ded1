//! Output files and the active pair shared by the session workers.

mod pair;

pub use pair::{
    basename_for, is_pair_file, OutputPair, PairSummary, FILE_PREFIX, METADATA_EXTENSION,
    PCAP_EXTENSION, SNAPLEN,
};

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info};

/// The pair currently receiving frames, behind the one lock both workers use.
///
/// Every open, write, flush and close of the active pair happens while
/// holding this lock, so a frame lands entirely in one pair.
#[derive(Clone, Default)]
pub struct ActivePair {
    inner: Arc<Mutex<Option<OutputPair>>>,
}

impl ActivePair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock. A worker that panicked while holding it leaves the
    /// pair in a usable state (each write is a whole record), so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, Option<OutputPair>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Close and clear the active pair, if any.
    pub fn close(&self) -> Option<PairSummary> {
        let pair = self.lock().take()?;
        close_pair(pair)
    }
}

/// Close `pair`, logging the outcome.
pub(crate) fn close_pair(pair: OutputPair) -> Option<PairSummary> {
    let basename = pair.basename().to_string();
    match pair.close() {
        Ok(summary) => {
            info!(
                "Closed capture pair {} ({} frames)",
                summary.basename, summary.frames
            );
            Some(summary)
        }
        Err(e) => {
            error!("Error closing capture pair {}: {}", basename, e);
            None
        }
    }
}

//! Captured link-layer frames.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// One captured frame as delivered by a capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Capture timestamp
    pub timestamp: DateTime<Utc>,
    /// Length of the frame on the wire (may exceed `data.len()` if truncated by the source)
    pub orig_len: u32,
    /// Captured bytes, starting at the Ethernet header
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame whose wire length equals the captured length.
    pub fn new(timestamp: DateTime<Utc>, data: Vec<u8>) -> Self {
        Self {
            timestamp,
            orig_len: data.len() as u32,
            data,
        }
    }

    pub fn with_orig_len(mut self, orig_len: u32) -> Self {
        self.orig_len = orig_len;
        self
    }

    /// Timestamp as an offset from the Unix epoch, clamped at the epoch.
    pub fn since_epoch(&self) -> Duration {
        let secs = self.timestamp.timestamp();
        if secs < 0 {
            return Duration::ZERO;
        }
        Duration::new(secs as u64, self.timestamp.timestamp_subsec_nanos())
    }
}

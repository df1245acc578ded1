//! Writes frames and their metadata records to the active pair.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::Frame;
use crate::error::FrameError;
use crate::output::{ActivePair, SNAPLEN};
use crate::parser::MetadataParser;
use crate::session::SessionStats;

/// Per-frame entry point of the ingestion loop.
///
/// Every frame that fits the snaplen reaches the pcap, whatever its headers
/// look like. Metadata is extracted before the lock is taken; the pcap record
/// and the JSON line are then written under one lock acquisition so a
/// rotation can never separate them.
pub struct PacketSink {
    /// Present only when the metadata sidecar is enabled
    parser: Option<MetadataParser>,
    active: ActivePair,
    stats: Arc<SessionStats>,
    /// Set while frames are being dropped for lack of an active pair
    dropping: AtomicBool,
}

impl PacketSink {
    pub fn new(interface: &str, metadata: bool, active: ActivePair, stats: Arc<SessionStats>) -> Self {
        Self {
            parser: metadata.then(|| MetadataParser::new(interface)),
            active,
            stats,
            dropping: AtomicBool::new(false),
        }
    }

    /// Write one frame to the active pair.
    ///
    /// Failures only affect this frame. With no active pair the frame is
    /// dropped; the first drop of a gap is logged as a warning.
    pub fn handle_frame(&self, frame: &Frame) -> Result<(), FrameError> {
        let result = self.write(frame);

        match &result {
            Ok(()) => {
                self.stats.record_written();
                if self.dropping.swap(false, Ordering::Relaxed) {
                    info!("Capture pair available again, resuming writes");
                }
            }
            Err(FrameError::NoActivePair) => {
                self.stats.record_dropped();
                if !self.dropping.swap(true, Ordering::Relaxed) {
                    warn!("No active capture pair, dropping frames until one is opened");
                }
            }
            Err(_) => self.stats.record_failed(),
        }

        result
    }

    fn write(&self, frame: &Frame) -> Result<(), FrameError> {
        if frame.data.len() > SNAPLEN as usize {
            return Err(FrameError::Oversize {
                len: frame.data.len(),
                snaplen: SNAPLEN,
            });
        }

        let line = self
            .parser
            .as_ref()
            .map(|parser| parser.parse(frame).to_json_line())
            .transpose();

        let mut guard = self.active.lock();
        let pair = guard.as_mut().ok_or(FrameError::NoActivePair)?;
        match line {
            Ok(line) => pair.write_frame(frame, line.as_deref())?,
            Err(e) => {
                // The raw frame is kept even when its record cannot be encoded
                pair.write_frame(frame, None)?;
                return Err(e.into());
            }
        }
        Ok(())
    }
}

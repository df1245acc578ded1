//! Replay of a recorded pcap file as a capture source.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pcap_file::pcap::PcapReader;
use tracing::info;

use super::{CaptureSource, FrameStream};
use crate::domain::Frame;
use crate::error::CaptureError;

/// Longest single sleep while pacing, so the running flag stays responsive.
const PACING_SLICE: Duration = Duration::from_millis(100);

/// Feeds the frames of a pcap file to a session, keeping recorded timestamps.
pub struct PcapFileSource {
    path: PathBuf,
    label: String,
    reader: PcapReader<BufReader<File>>,
    realtime: bool,
    running: Arc<AtomicBool>,
}

impl PcapFileSource {
    /// Open `path` and validate its pcap header. `label` is reported as the interface name.
    pub fn open(path: impl AsRef<Path>, label: impl Into<String>) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| CaptureError::Replay {
            path: path.clone(),
            source: pcap_file::PcapError::IoError(e),
        })?;
        let reader = PcapReader::new(BufReader::new(file)).map_err(|source| {
            CaptureError::Replay {
                path: path.clone(),
                source,
            }
        })?;

        Ok(Self {
            path,
            label: label.into(),
            reader,
            realtime: false,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Sleep between frames according to their recorded spacing.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

impl CaptureSource for PcapFileSource {
    fn frames(&mut self) -> Result<FrameStream<'_>, CaptureError> {
        info!("Replaying {}", self.path.display());
        Ok(Box::new(ReplayIterator {
            path: &self.path,
            reader: &mut self.reader,
            realtime: self.realtime,
            running: Arc::clone(&self.running),
            previous: None,
        }))
    }

    fn interface_name(&self) -> &str {
        &self.label
    }

    fn set_running(&mut self, running: Arc<AtomicBool>) {
        self.running = running;
    }
}

struct ReplayIterator<'a> {
    path: &'a Path,
    reader: &'a mut PcapReader<BufReader<File>>,
    realtime: bool,
    running: Arc<AtomicBool>,
    previous: Option<Duration>,
}

impl ReplayIterator<'_> {
    /// Wait out the recorded gap before a frame. Returns false if stopped meanwhile.
    fn pace(&self, timestamp: Duration) -> bool {
        let Some(previous) = self.previous else {
            return true;
        };
        let mut remaining = timestamp.saturating_sub(previous);
        while !remaining.is_zero() {
            if !self.running.load(Ordering::SeqCst) {
                return false;
            }
            let slice = remaining.min(PACING_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
        true
    }
}

impl Iterator for ReplayIterator<'_> {
    type Item = Result<Frame, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }

        let (timestamp, frame) = match self.reader.next_packet()? {
            Ok(packet) => {
                let timestamp = DateTime::<Utc>::from_timestamp(
                    packet.timestamp.as_secs() as i64,
                    packet.timestamp.subsec_nanos(),
                )
                .unwrap_or_else(Utc::now);
                let frame = Frame::new(timestamp, packet.data.into_owned())
                    .with_orig_len(packet.orig_len);
                (packet.timestamp, frame)
            }
            Err(source) => {
                return Some(Err(CaptureError::Replay {
                    path: self.path.to_path_buf(),
                    source,
                }))
            }
        };

        if self.realtime && !self.pace(timestamp) {
            return None;
        }
        self.previous = Some(timestamp);
        Some(Ok(frame))
    }
}

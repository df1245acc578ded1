//! Capture source abstraction.
//!
//! This module defines the `CaptureSource` trait and provides a live
//! pnet-based implementation plus a pcap file replay. The session only
//! depends on the trait, so tests drive it with scripted frames.

mod pcap_replay;
mod pnet_capture;

pub use pcap_replay::PcapFileSource;
pub use pnet_capture::PnetSource;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::domain::Frame;
use crate::error::CaptureError;

/// Frames in arrival order. An `Err` item is fatal to the session.
pub type FrameStream<'a> = Box<dyn Iterator<Item = Result<Frame, CaptureError>> + 'a>;

/// Trait for frame sources consumed by a capture session.
///
/// Implementations must deliver frames in arrival order and must poll the
/// running flag between frames (or on an idle read timeout) so that a stop
/// request is observed promptly.
pub trait CaptureSource: Send {
    /// Start capturing and return the frame stream.
    ///
    /// The stream ends once the running flag is cleared.
    fn frames(&mut self) -> Result<FrameStream<'_>, CaptureError>;

    /// Get the name of the interface being captured.
    fn interface_name(&self) -> &str;

    /// Set the running flag for graceful shutdown.
    fn set_running(&mut self, running: Arc<AtomicBool>);
}

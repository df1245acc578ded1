//! Capture session lifecycle.
//!
//! `CaptureSession` is the public entry point: it opens the first pair and
//! runs the ingestion and rotation workers until stopped.

mod capture_session;
mod stats;

pub use capture_session::{CaptureSession, StopReason};
pub use stats::{SessionStats, StatsSnapshot};

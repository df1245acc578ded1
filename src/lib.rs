//! Rotocap - rotating packet collector
//!
//! Captures link-layer frames from an interface and writes them to
//! time-bounded pairs of files: a pcap capture and an optional JSON Lines
//! metadata sidecar. Pairs rotate on age and the oldest are pruned so the
//! output directory stays bounded.

pub mod capture;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod parser;
pub mod rotation;
pub mod session;
pub mod sink;

#[cfg(test)]
mod test_utils;

pub use capture::{CaptureSource, PcapFileSource, PnetSource};
pub use config::CaptureSessionConfig;
pub use domain::{Frame, FrameMetadata, L4Class};
pub use error::{CaptureError, ConfigError, FrameError, OutputError, SessionError};
pub use session::{CaptureSession, StatsSnapshot, StopReason};

//! Error types for the collector.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a capture source. These are fatal to a running session.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("Failed to create capture channel: {0}")]
    ChannelCreation(String),

    #[error("Insufficient permissions to capture packets (try running as root)")]
    InsufficientPermissions,

    #[error("Capture receive failed: {0}")]
    Receive(#[source] std::io::Error),

    #[error("Replay of {path} failed: {source}")]
    Replay {
        path: PathBuf,
        #[source]
        source: pcap_file::PcapError,
    },
}

/// Failures while opening, writing or closing an output pair.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pcap error on {path}: {source}")]
    Pcap {
        path: PathBuf,
        #[source]
        source: pcap_file::PcapError,
    },
}

/// Failures while processing a single frame.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame of {len} bytes exceeds the {snaplen} byte snaplen")]
    Oversize { len: usize, snaplen: u32 },

    #[error("Failed to encode metadata: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No active output pair")]
    NoActivePair,

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Invalid session configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Interface name must not be empty")]
    MissingInterface,

    #[error("Rotation interval must be at least 1 second")]
    InvalidRotateInterval,

    #[error("Maximum retained pairs must be at least 1")]
    InvalidMaxPairs,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors surfaced by the session lifecycle.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Capture session is already running")]
    AlreadyRunning,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

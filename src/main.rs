//! rotocap - rotating packet collector
//!
//! Captures frames from an interface (or replays a pcap file) into rotating
//! pcap + JSONL pairs until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rotocap::{
    CaptureSession, CaptureSessionConfig, CaptureSource, PcapFileSource, PnetSource, StopReason,
};

const WAIT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "rotocap")]
#[command(about = "Rotating packet collector writing pcap + JSONL metadata pairs")]
#[command(version)]
struct Args {
    /// Interface to capture on (default: first active non-loopback interface)
    #[arg(short, long)]
    iface: Option<String>,

    /// Directory for capture pairs [default: captures]
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Rotate the active pair after this many seconds [default: 300]
    #[arg(long)]
    rotate_seconds: Option<u64>,

    /// Number of pairs to keep [default: 48]
    #[arg(long)]
    max_files: Option<usize>,

    /// Do not write the JSONL metadata sidecar
    #[arg(long)]
    no_meta: bool,

    /// List capture interfaces and exit
    #[arg(long)]
    list_ifaces: bool,

    /// Replay frames from a pcap file instead of a live interface
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Pace the replay by recorded timestamps
    #[arg(long, requires = "replay")]
    realtime: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.list_ifaces {
        for name in PnetSource::list_interfaces() {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "rotocap=debug" } else { "rotocap=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    let source = open_source(&args)?;
    let config = build_config(&args, source.interface_name())?;

    info!("Starting rotocap");
    info!("Output directory: {}", config.out_dir.display());

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install signal handler")?;

    let mut session = CaptureSession::new();
    session
        .start(config, source)
        .context("Failed to start capture session")?;

    // Wait for a signal, or for the session to end itself
    while !shutdown.load(Ordering::SeqCst) && session.is_running() {
        thread::sleep(WAIT_INTERVAL);
    }
    if shutdown.load(Ordering::SeqCst) {
        info!("Received shutdown signal");
    }

    session.stop();

    match session.stop_reason() {
        Some(StopReason::SourceFailed(msg)) => {
            error!("Capture failed: {}", msg);
            Ok(ExitCode::FAILURE)
        }
        reason => {
            if let Some(reason) = reason {
                info!("Session ended: {}", reason);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_source(args: &Args) -> Result<Box<dyn CaptureSource>> {
    if let Some(path) = &args.replay {
        let label = args.iface.clone().unwrap_or_else(|| "replay".to_string());
        let source = PcapFileSource::open(path, label)
            .with_context(|| format!("Failed to open replay file {}", path.display()))?
            .with_realtime(args.realtime);
        return Ok(Box::new(source));
    }

    let source = match &args.iface {
        Some(name) => PnetSource::new(name)?,
        None => PnetSource::on_default_interface().context("No usable capture interface")?,
    };
    Ok(Box::new(source))
}

/// Defaults, then `ROTOCAP_*` environment overrides, then explicit flags.
fn build_config(args: &Args, interface: &str) -> Result<CaptureSessionConfig> {
    let mut config = CaptureSessionConfig::new(interface)
        .apply_env_overrides()
        .context("Invalid environment configuration")?;

    if let Some(out_dir) = &args.out_dir {
        config = config.with_out_dir(out_dir.clone());
    }
    if let Some(seconds) = args.rotate_seconds {
        config = config.with_rotate_seconds(seconds);
    }
    if let Some(max_files) = args.max_files {
        config = config.with_max_pairs(max_files);
    }
    if args.no_meta {
        config = config.with_metadata(false);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

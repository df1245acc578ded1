//! pnet-based live capture implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pnet::datalink::{self, Channel, Config, NetworkInterface};
use tracing::{debug, info, warn};

use super::{CaptureSource, FrameStream};
use crate::domain::Frame;
use crate::error::CaptureError;
use crate::output::SNAPLEN;

/// Idle read timeout; bounds how long a stop request can go unnoticed.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// One byte past the snaplen: a frame that fills the buffer was cut by the
/// kernel and is rejected downstream instead of being recorded short.
const READ_BUFFER_SIZE: usize = SNAPLEN as usize + 1;

/// Live link-layer capture using the pnet datalink channel.
pub struct PnetSource {
    interface: NetworkInterface,
    running: Arc<AtomicBool>,
}

impl PnetSource {
    /// Create a new capture on the specified interface.
    pub fn new(interface_name: &str) -> Result<Self, CaptureError> {
        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface_name)
            .ok_or_else(|| CaptureError::InterfaceNotFound(interface_name.to_string()))?;

        Ok(Self::from_interface(interface))
    }

    /// Create a capture on the first suitable interface.
    ///
    /// Prefers an interface that is up, not loopback and has an address.
    /// Falls back to the first interface the system reports.
    pub fn on_default_interface() -> Result<Self, CaptureError> {
        let interfaces = datalink::interfaces();
        debug!(
            "Detected interfaces: {:?}",
            interfaces.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
        );

        if let Some(iface) = interfaces
            .iter()
            .find(|iface| iface.is_up() && !iface.is_loopback() && !iface.ips.is_empty())
        {
            info!("Selected active interface: {}", iface.name);
            return Ok(Self::from_interface(iface.clone()));
        }

        let first = interfaces.into_iter().next().ok_or_else(|| {
            CaptureError::InterfaceNotFound("no interfaces available".to_string())
        })?;
        warn!(
            "No active interface with an IP address found, using the first one: {}",
            first.name
        );
        Ok(Self::from_interface(first))
    }

    /// List all available network interfaces.
    pub fn list_interfaces() -> Vec<String> {
        datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let status = if iface.is_up() { "UP" } else { "DOWN" };
                let ips: Vec<_> = iface.ips.iter().map(|ip| ip.to_string()).collect();
                format!(
                    "{}: {} [{}]",
                    iface.name,
                    status,
                    if ips.is_empty() {
                        "no IP".to_string()
                    } else {
                        ips.join(", ")
                    }
                )
            })
            .collect()
    }

    fn from_interface(interface: NetworkInterface) -> Self {
        Self {
            interface,
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl CaptureSource for PnetSource {
    fn frames(&mut self) -> Result<FrameStream<'_>, CaptureError> {
        let config = Config {
            read_timeout: Some(READ_TIMEOUT),
            read_buffer_size: READ_BUFFER_SIZE,
            ..Config::default()
        };

        let rx = match datalink::channel(&self.interface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => {
                return Err(CaptureError::ChannelCreation(
                    "unsupported channel type".to_string(),
                ))
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("permission") || msg.contains("Operation not permitted") {
                    return Err(CaptureError::InsufficientPermissions);
                }
                return Err(CaptureError::ChannelCreation(msg));
            }
        };

        info!("Sniffing on interface {}", self.interface.name);

        Ok(Box::new(LiveFrameIterator {
            rx,
            running: Arc::clone(&self.running),
        }))
    }

    fn interface_name(&self) -> &str {
        &self.interface.name
    }

    fn set_running(&mut self, running: Arc<AtomicBool>) {
        self.running = running;
    }
}

/// Iterator that yields every frame received on the channel.
struct LiveFrameIterator {
    rx: Box<dyn datalink::DataLinkReceiver>,
    running: Arc<AtomicBool>,
}

impl Iterator for LiveFrameIterator {
    type Item = Result<Frame, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return None;
            }
            match self.rx.next() {
                Ok(packet) => return Some(Ok(Frame::new(Utc::now(), packet.to_vec()))),
                Err(e) => match e.kind() {
                    // Idle timeout, check the running flag again
                    std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted => continue,
                    _ => return Some(Err(CaptureError::Receive(e))),
                },
            }
        }
    }
}

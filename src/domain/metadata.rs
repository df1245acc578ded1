//! Per-frame metadata records written to the JSONL sidecar.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, SecondsFormat, Utc};
use macaddr::MacAddr6;
use serde::{Serialize, Serializer};

/// Marker written instead of a classification when a frame carries no IP layer.
pub const NON_IP_NOTE: &str = "non-ip";

/// Transport classification of an IP frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum L4Class {
    Tcp,
    Udp,
    Icmp,
    Other,
}

impl fmt::Display for L4Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
            Self::Icmp => write!(f, "ICMP"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// One sidecar record. Absent fields are omitted from the JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameMetadata {
    #[serde(serialize_with = "serialize_ts")]
    pub ts: DateTime<Utc>,
    pub len: u32,
    pub iface: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_mac"
    )]
    pub src_mac: Option<MacAddr6>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_mac"
    )]
    pub dst_mac: Option<MacAddr6>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_proto: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l4: Option<L4Class>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl FrameMetadata {
    /// A record with only the always-present fields. Starts out as non-IP.
    pub fn new(ts: DateTime<Utc>, len: u32, iface: impl Into<String>) -> Self {
        Self {
            ts,
            len,
            iface: iface.into(),
            src_mac: None,
            dst_mac: None,
            src_ip: None,
            dst_ip: None,
            ip_proto: None,
            src_port: None,
            dst_port: None,
            l4: None,
            note: Some(NON_IP_NOTE),
        }
    }

    pub fn with_macs(mut self, src: MacAddr6, dst: MacAddr6) -> Self {
        self.src_mac = Some(src);
        self.dst_mac = Some(dst);
        self
    }

    /// Record the IP layer. Classification defaults to `OTHER` until a transport is found.
    pub fn with_ip(mut self, src: IpAddr, dst: IpAddr, proto: u8) -> Self {
        self.src_ip = Some(src);
        self.dst_ip = Some(dst);
        self.ip_proto = Some(proto);
        self.l4 = Some(L4Class::Other);
        self.note = None;
        self
    }

    pub fn with_l4(mut self, class: L4Class) -> Self {
        self.l4 = Some(class);
        self
    }

    pub fn with_ports(mut self, src: u16, dst: u16) -> Self {
        self.src_port = Some(src);
        self.dst_port = Some(dst);
        self
    }

    /// Serialize as a single JSON line without the trailing newline.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Format a MAC address as uppercase colon-separated hex.
pub fn format_mac(mac: &MacAddr6) -> String {
    mac.as_bytes()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn serialize_ts<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn serialize_mac<S: Serializer>(mac: &Option<MacAddr6>, s: S) -> Result<S::Ok, S::Error> {
    match mac {
        Some(mac) => s.serialize_str(&format_mac(mac)),
        None => s.serialize_none(),
    }
}

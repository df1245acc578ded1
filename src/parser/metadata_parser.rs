//! Metadata extraction from captured frames.

use std::net::IpAddr;

use macaddr::MacAddr6;
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;

use tracing::trace;

use crate::domain::{Frame, FrameMetadata, L4Class};

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;

/// Builds a [`FrameMetadata`] record for each frame captured on one interface.
///
/// Only headers are inspected: Ethernet (with at most one 802.1Q tag),
/// IPv4/IPv6, and the TCP/UDP port pair. Anything deeper is left alone.
pub struct MetadataParser {
    interface: String,
}

impl MetadataParser {
    /// Create a parser that stamps records with `interface`.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    /// Extract the metadata record for a frame.
    ///
    /// Never fails. A frame cut short keeps whatever was decoded before the
    /// cut: without a complete IP header it is recorded as `non-ip`, and with
    /// unusable IP options or transport header it is classified `OTHER`.
    pub fn parse(&self, frame: &Frame) -> FrameMetadata {
        let data = frame.data.as_slice();
        let meta = FrameMetadata::new(frame.timestamp, frame.orig_len, self.interface.as_str());

        let Some(ethernet) = EthernetPacket::new(data) else {
            trace!("Ethernet header truncated: {} bytes", data.len());
            return meta;
        };
        let meta = meta.with_macs(
            MacAddr6::from(ethernet.get_source().octets()),
            MacAddr6::from(ethernet.get_destination().octets()),
        );

        let mut ethertype = ethernet.get_ethertype();
        let mut payload = &data[ETHERNET_HEADER_LEN..];

        if ethertype == EtherTypes::Vlan {
            if payload.len() < VLAN_TAG_LEN {
                trace!("VLAN tag truncated: {} bytes", payload.len());
                return meta;
            }
            ethertype = EtherType::new(u16::from_be_bytes([payload[2], payload[3]]));
            payload = &payload[VLAN_TAG_LEN..];
        }

        if ethertype == EtherTypes::Ipv4 {
            Self::parse_ipv4(meta, payload)
        } else if ethertype == EtherTypes::Ipv6 {
            Self::parse_ipv6(meta, payload)
        } else {
            meta
        }
    }

    fn parse_ipv4(meta: FrameMetadata, data: &[u8]) -> FrameMetadata {
        let Some(ipv4) = Ipv4Packet::new(data) else {
            trace!("IPv4 header truncated: {} bytes", data.len());
            return meta;
        };

        let protocol = ipv4.get_next_level_protocol();
        let meta = meta.with_ip(
            IpAddr::V4(ipv4.get_source()),
            IpAddr::V4(ipv4.get_destination()),
            protocol.0,
        );

        let header_len = ipv4.get_header_length() as usize * 4;
        if header_len < IPV4_MIN_HEADER_LEN || header_len > data.len() {
            trace!("IPv4 header length {} invalid for {} bytes", header_len, data.len());
            return meta;
        }

        // Offloaded frames can report a zero total length; fall back to the buffer.
        let total_len = ipv4.get_total_length() as usize;
        let end = if total_len >= header_len && total_len <= data.len() {
            total_len
        } else {
            data.len()
        };

        // Non-first fragments carry no transport header.
        if ipv4.get_fragment_offset() != 0 {
            return meta;
        }

        Self::classify(meta, protocol, &data[header_len..end])
    }

    fn parse_ipv6(meta: FrameMetadata, data: &[u8]) -> FrameMetadata {
        let Some(ipv6) = Ipv6Packet::new(data) else {
            trace!("IPv6 header truncated: {} bytes", data.len());
            return meta;
        };

        let next_header = ipv6.get_next_header();
        let meta = meta.with_ip(
            IpAddr::V6(ipv6.get_source()),
            IpAddr::V6(ipv6.get_destination()),
            next_header.0,
        );

        Self::classify(meta, next_header, &data[IPV6_HEADER_LEN..])
    }

    fn classify(
        meta: FrameMetadata,
        protocol: IpNextHeaderProtocol,
        transport: &[u8],
    ) -> FrameMetadata {
        if protocol == IpNextHeaderProtocols::Tcp {
            match TcpPacket::new(transport) {
                Some(tcp) => meta
                    .with_l4(L4Class::Tcp)
                    .with_ports(tcp.get_source(), tcp.get_destination()),
                None => meta,
            }
        } else if protocol == IpNextHeaderProtocols::Udp {
            match UdpPacket::new(transport) {
                Some(udp) => meta
                    .with_l4(L4Class::Udp)
                    .with_ports(udp.get_source(), udp.get_destination()),
                None => meta,
            }
        } else if protocol == IpNextHeaderProtocols::Icmp
            || protocol == IpNextHeaderProtocols::Icmpv6
        {
            meta.with_l4(L4Class::Icmp)
        } else {
            meta
        }
    }
}

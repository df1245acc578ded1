//! Synthetic frame generation for testing
//!
//! Builds Ethernet frames with known header fields. Checksums are left at
//! zero since nothing in the collector validates them.

use std::net::Ipv6Addr;

use chrono::Utc;

use crate::domain::Frame;

pub const SRC_MAC: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
pub const DST_MAC: [u8; 6] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;
const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_VLAN: u16 = 0x8100;

/// Wrap `payload` in an Ethernet header.
pub fn ethernet_frame(ethertype: u16, payload: &[u8]) -> Frame {
    let mut data = Vec::with_capacity(14 + payload.len());
    data.extend_from_slice(&DST_MAC);
    data.extend_from_slice(&SRC_MAC);
    data.extend_from_slice(&ethertype.to_be_bytes());
    data.extend_from_slice(payload);
    Frame::new(Utc::now(), data)
}

/// IPv4 packet with a 20-byte header.
pub fn ipv4_packet(src: [u8; 4], dst: [u8; 4], protocol: u8, payload: &[u8]) -> Vec<u8> {
    let total_len = (20 + payload.len()) as u16;
    let mut packet = vec![0u8; 20];
    packet[0] = 0x45;
    packet[2..4].copy_from_slice(&total_len.to_be_bytes());
    packet[8] = 64;
    packet[9] = protocol;
    packet[12..16].copy_from_slice(&src);
    packet[16..20].copy_from_slice(&dst);
    packet.extend_from_slice(payload);
    packet
}

pub fn ipv4_frame(src: [u8; 4], dst: [u8; 4], protocol: u8, payload: &[u8]) -> Frame {
    ethernet_frame(ETHERTYPE_IPV4, &ipv4_packet(src, dst, protocol, payload))
}

pub fn ipv6_frame(src: Ipv6Addr, dst: Ipv6Addr, next_header: u8, payload: &[u8]) -> Frame {
    let mut packet = vec![0u8; 40];
    packet[0] = 0x60;
    packet[4..6].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    packet[6] = next_header;
    packet[7] = 64;
    packet[8..24].copy_from_slice(&src.octets());
    packet[24..40].copy_from_slice(&dst.octets());
    packet.extend_from_slice(payload);
    ethernet_frame(ETHERTYPE_IPV6, &packet)
}

/// Minimal TCP header (data offset 5, SYN set).
pub fn tcp_header(src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut header = vec![0u8; 20];
    header[0..2].copy_from_slice(&src_port.to_be_bytes());
    header[2..4].copy_from_slice(&dst_port.to_be_bytes());
    header[12] = 0x50;
    header[13] = 0x02;
    header
}

pub fn udp_header(src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut header = vec![0u8; 8];
    header[0..2].copy_from_slice(&src_port.to_be_bytes());
    header[2..4].copy_from_slice(&dst_port.to_be_bytes());
    header[4..6].copy_from_slice(&8u16.to_be_bytes());
    header
}

pub fn tcp_frame(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16) -> Frame {
    ipv4_frame(src, dst, 6, &tcp_header(src_port, dst_port))
}

pub fn udp_frame(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16) -> Frame {
    ipv4_frame(src, dst, 17, &udp_header(src_port, dst_port))
}

/// ICMP echo request.
pub fn icmp_frame(src: [u8; 4], dst: [u8; 4]) -> Frame {
    ipv4_frame(src, dst, 1, &[8, 0, 0, 0, 0, 1, 0, 1])
}

/// ARP who-has request.
pub fn arp_frame() -> Frame {
    let mut arp = vec![0u8; 28];
    arp[0..2].copy_from_slice(&1u16.to_be_bytes());
    arp[2..4].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
    arp[4] = 6;
    arp[5] = 4;
    arp[6..8].copy_from_slice(&1u16.to_be_bytes());
    arp[8..14].copy_from_slice(&SRC_MAC);
    arp[14..18].copy_from_slice(&[10, 0, 0, 1]);
    arp[24..28].copy_from_slice(&[10, 0, 0, 2]);
    ethernet_frame(ETHERTYPE_ARP, &arp)
}

/// Insert an 802.1Q tag after the MAC addresses of `frame`.
pub fn vlan_tagged(frame: &Frame, vlan_id: u16) -> Frame {
    let mut data = Vec::with_capacity(frame.data.len() + 4);
    data.extend_from_slice(&frame.data[..12]);
    data.extend_from_slice(&ETHERTYPE_VLAN.to_be_bytes());
    data.extend_from_slice(&(vlan_id & 0x0fff).to_be_bytes());
    data.extend_from_slice(&frame.data[12..]);
    Frame::new(frame.timestamp, data)
}

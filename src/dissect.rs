//! Ethernet -> IPv4 -> UDP/TCP dissection of a single frame.
//!
//! [`dissect`] is a pure function: it never panics on short or damaged input, and every reason a
//! frame cannot be summarised is a [`DissectError`] value. Checksums, IPv4 options and fragments
//! are not interpreted.

use std::{
    fmt,
    net::{Ipv4Addr, SocketAddrV4},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::source::RawFrame;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
pub const TCP_MIN_HEADER_LEN: usize = 20;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

// The data offset nibble sits in byte 12 of the TCP header.
const TCP_DATA_OFFSET_END: usize = 13;

/// Why a frame produced no summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DissectError {
    #[error("{layer} header truncated: {needed} bytes needed, {available} captured")]
    Truncated {
        layer: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("unsupported ethertype {0:#06x}")]
    UnsupportedEtherType(u16),
    #[error("malformed IPv4 header: {0}")]
    MalformedIp(String),
    #[error("unsupported IP protocol {0}")]
    UnsupportedProtocol(u8),
    #[error("malformed TCP header: {0}")]
    MalformedTcp(String),
}

impl DissectError {
    /// True for damaged frames, false for well-formed traffic that is simply not UDP/TCP over
    /// IPv4.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            DissectError::Truncated { .. }
                | DissectError::MalformedIp(_)
                | DissectError::MalformedTcp(_)
        )
    }
}

fn be16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ethertype: u16,
}

impl EthernetHeader {
    /// Splits a frame into its Ethernet header and payload.
    pub fn parse(frame: &[u8]) -> Result<(EthernetHeader, &[u8]), DissectError> {
        if frame.len() < ETHERNET_HEADER_LEN {
            return Err(DissectError::Truncated {
                layer: "Ethernet",
                needed: ETHERNET_HEADER_LEN,
                available: frame.len(),
            });
        }

        let mut destination = [0u8; 6];
        let mut source = [0u8; 6];
        destination.copy_from_slice(&frame[0..6]);
        source.copy_from_slice(&frame[6..12]);

        let header = EthernetHeader {
            destination,
            source,
            ethertype: be16(frame, 12),
        };
        Ok((header, &frame[ETHERNET_HEADER_LEN..]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// IHL * 4, at least 20
    pub header_len: usize,
    pub total_len: u16,
    pub protocol: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Parses the IPv4 header at the start of `bytes`.
    ///
    /// The returned payload ends at the datagram's total length, or at the end of the captured
    /// bytes when the frame was cut short by the snaplen. Ethernet padding is dropped.
    pub fn parse(bytes: &[u8]) -> Result<(Ipv4Header, &[u8]), DissectError> {
        if bytes.len() < IPV4_MIN_HEADER_LEN {
            return Err(DissectError::MalformedIp(format!(
                "only {} of {} header bytes captured",
                bytes.len(),
                IPV4_MIN_HEADER_LEN
            )));
        }

        let version = bytes[0] >> 4;
        if version != 4 {
            return Err(DissectError::MalformedIp(format!("version {version}")));
        }

        let header_len = usize::from(bytes[0] & 0x0f) * 4;
        if header_len < IPV4_MIN_HEADER_LEN {
            return Err(DissectError::MalformedIp(format!(
                "header length {header_len} below minimum"
            )));
        }
        if header_len > bytes.len() {
            return Err(DissectError::MalformedIp(format!(
                "header length {header_len} exceeds the {} captured bytes",
                bytes.len()
            )));
        }

        let total_len = be16(bytes, 2);
        if usize::from(total_len) < header_len {
            return Err(DissectError::MalformedIp(format!(
                "total length {total_len} smaller than header length {header_len}"
            )));
        }

        let header = Ipv4Header {
            header_len,
            total_len,
            protocol: bytes[9],
            source: Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]),
            destination: Ipv4Addr::new(bytes[16], bytes[17], bytes[18], bytes[19]),
        };
        let end = bytes.len().min(usize::from(total_len));
        Ok((header, &bytes[header_len..end]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// Header plus payload, as encoded
    pub length: u16,
}

impl UdpHeader {
    pub fn parse(bytes: &[u8]) -> Result<UdpHeader, DissectError> {
        if bytes.len() < UDP_HEADER_LEN {
            return Err(DissectError::Truncated {
                layer: "UDP",
                needed: UDP_HEADER_LEN,
                available: bytes.len(),
            });
        }

        Ok(UdpHeader {
            src_port: be16(bytes, 0),
            dst_port: be16(bytes, 2),
            length: be16(bytes, 4),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// Data offset * 4
    pub header_len: usize,
}

impl TcpHeader {
    pub fn parse(bytes: &[u8]) -> Result<TcpHeader, DissectError> {
        if bytes.len() < TCP_DATA_OFFSET_END {
            return Err(DissectError::Truncated {
                layer: "TCP",
                needed: TCP_DATA_OFFSET_END,
                available: bytes.len(),
            });
        }

        let header_len = usize::from(bytes[12] >> 4) * 4;
        if header_len < TCP_MIN_HEADER_LEN {
            return Err(DissectError::MalformedTcp(format!(
                "header length {header_len} below minimum"
            )));
        }
        if header_len > bytes.len() {
            return Err(DissectError::MalformedTcp(format!(
                "header length {header_len} exceeds the {} captured bytes",
                bytes.len()
            )));
        }

        Ok(TcpHeader {
            src_port: be16(bytes, 0),
            dst_port: be16(bytes, 2),
            header_len,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHeader {
    Udp(UdpHeader),
    Tcp(TcpHeader),
}

impl TransportHeader {
    pub fn protocol(&self) -> Protocol {
        match self {
            TransportHeader::Udp(_) => Protocol::Udp,
            TransportHeader::Tcp(_) => Protocol::Tcp,
        }
    }

    pub fn ports(&self) -> (u16, u16) {
        match self {
            TransportHeader::Udp(udp) => (udp.src_port, udp.dst_port),
            TransportHeader::Tcp(tcp) => (tcp.src_port, tcp.dst_port),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => f.write_str("UDP"),
            Protocol::Tcp => f.write_str("TCP"),
        }
    }
}

/// What gets reported for one UDP or TCP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSummary {
    pub timestamp: DateTime<Utc>,
    pub protocol: Protocol,
    pub source: SocketAddrV4,
    pub destination: SocketAddrV4,
    /// The UDP length field, or the TCP segment payload length
    pub length: u16,
}

/// Summarises a captured Ethernet frame.
pub fn dissect(frame: &RawFrame) -> Result<PacketSummary, DissectError> {
    let (ethernet, payload) = EthernetHeader::parse(&frame.data)?;
    if ethernet.ethertype != ETHERTYPE_IPV4 {
        return Err(DissectError::UnsupportedEtherType(ethernet.ethertype));
    }

    let (ip, payload) = Ipv4Header::parse(payload)?;
    let (transport, length) = match ip.protocol {
        IPPROTO_UDP => {
            let udp = UdpHeader::parse(payload)?;
            (TransportHeader::Udp(udp), udp.length)
        }
        IPPROTO_TCP => {
            let tcp = TcpHeader::parse(payload)?;
            let segment = usize::from(ip.total_len)
                .checked_sub(ip.header_len + tcp.header_len)
                .ok_or_else(|| {
                    DissectError::MalformedTcp(format!(
                        "header length {} does not fit in IP total length {}",
                        tcp.header_len, ip.total_len
                    ))
                })?;
            // total_len is a u16, so the difference is too.
            (TransportHeader::Tcp(tcp), segment as u16)
        }
        other => return Err(DissectError::UnsupportedProtocol(other)),
    };

    let (src_port, dst_port) = transport.ports();
    Ok(PacketSummary {
        timestamp: frame.timestamp,
        protocol: transport.protocol(),
        source: SocketAddrV4::new(ip.source, src_port),
        destination: SocketAddrV4::new(ip.destination, dst_port),
        length,
    })
}

//! TUN-backed driver wiring a [`Router`] of [`NetworkInterface`]s to real
//! raw sockets. This is the one module in the crate that owns actual
//! device I/O; everything it calls into (`NetworkInterface`, `Router`,
//! `TCPSender`, `TCPReceiver`) is pure and synchronous. Generalized from a
//! single hardcoded TCP connection table to the router/interface core this
//! crate builds.

use std::io;

use etherparse::{IpNumber, Ipv4HeaderSlice};
use tracing::{trace, warn};

use crate::error::CoreError;
use crate::net::{EthernetFrame, EthernetPayload, Ipv4Datagram};

const BUFFER_SIZE: usize = 1504;

/// A raw TUN device. Owns no `NetworkInterface` state of its own — a
/// `Router` owns those, keyed by interface index, so one `Device` per
/// route-table entry is paired up by the caller (see `main.rs`). This
/// keeps the pure core (`net::router`, `net::interface`) free of any
/// direct dependency on `tun_tap`.
pub struct Device {
    iface: tun_tap::Iface,
}

impl Device {
    pub fn new(tun_name: &str) -> Result<Self, CoreError> {
        let iface = tun_tap::Iface::without_packet_info(tun_name, tun_tap::Mode::Tun)?;
        Ok(Device { iface })
    }

    /// Reads one raw frame off the wire and decodes it, if possible.
    /// Malformed input is dropped silently rather than surfaced as an error.
    pub fn recv_frame(&mut self) -> io::Result<Option<EthernetFrame>> {
        let mut buf = [0u8; BUFFER_SIZE];
        let nbytes = self.iface.recv(&mut buf[..])?;
        match decode_frame(&buf[..nbytes]) {
            Some(frame) => Ok(Some(frame)),
            None => {
                trace!(len = nbytes, "ignoring frame: failed to decode");
                Ok(None)
            }
        }
    }

    /// Encodes and writes one frame out to the wire.
    pub fn send_frame(&mut self, frame: &EthernetFrame) -> io::Result<()> {
        let bytes = encode_frame(frame);
        self.iface.send(&bytes)?;
        Ok(())
    }
}

/// Parses a raw frame into this crate's local `EthernetFrame` value type.
/// Only the IPv4 path does real wire parsing; actual Ethernet/ARP byte
/// layout is a collaborator concern, so the Ethernet/ARP framing this
/// crate's tests exercise is built directly as values rather than
/// round-tripped through bytes.
fn decode_frame(buf: &[u8]) -> Option<EthernetFrame> {
    if buf.len() < 20 {
        return None;
    }
    let version = buf[0] >> 4;
    if version != 4 {
        return None;
    }
    match Ipv4HeaderSlice::from_slice(buf) {
        Ok(ip) => {
            let ip_len = ip.slice().len();
            if ip.protocol() != IpNumber::TCP {
                warn!("dropping non-TCP IPv4 payload: only TCP is wired up");
            }
            let src = ip.source_addr();
            let dst = ip.destination_addr();
            let payload = buf[ip_len..].to_vec();
            Some(EthernetFrame {
                src: [0; 6],
                dst: [0; 6],
                payload: EthernetPayload::Ipv4(Ipv4Datagram {
                    src,
                    dst,
                    ttl: ip.ttl(),
                    checksum: ip.header_checksum(),
                    payload,
                }),
            })
        }
        Err(_) => None,
    }
}

fn encode_frame(frame: &EthernetFrame) -> Vec<u8> {
    match &frame.payload {
        EthernetPayload::Ipv4(dgram) => dgram.payload.clone(),
        EthernetPayload::Arp(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_frame_rejects_short_buffer() {
        assert!(decode_frame(&[0u8; 4]).is_none());
    }

    #[test]
    fn decode_frame_rejects_non_ipv4_version() {
        let mut buf = [0u8; 20];
        buf[0] = 0x60; // IPv6 version nibble
        assert!(decode_frame(&buf).is_none());
    }
}

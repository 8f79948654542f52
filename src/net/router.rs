//! Longest-prefix-match IPv4 router composed from `NetworkInterface`s.

use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::error::CoreError;
use crate::net::frame::Ipv4Datagram;
use crate::net::interface::NetworkInterface;

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub prefix: u32,
    pub length: u8,
    pub next_hop: Option<Ipv4Addr>,
    pub interface_index: usize,
}

#[derive(Debug, Default)]
pub struct Router {
    entries: Vec<RouteEntry>,
    interfaces: Vec<NetworkInterface>,
}

impl Router {
    pub fn new() -> Self {
        Router::default()
    }

    pub fn add_interface(&mut self, interface: NetworkInterface) -> usize {
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    pub fn interface(&mut self, index: usize) -> &mut NetworkInterface {
        &mut self.interfaces[index]
    }

    pub fn add_route(
        &mut self,
        prefix: u32,
        length: u8,
        next_hop: Option<Ipv4Addr>,
        interface_index: usize,
    ) -> Result<(), CoreError> {
        if length > 32 {
            return Err(CoreError::InvalidPrefixLength(length));
        }
        if interface_index >= self.interfaces.len() {
            return Err(CoreError::InterfaceIndexOutOfRange(interface_index));
        }
        debug!(
            prefix = format!("{}/{}", Ipv4Addr::from(prefix), length),
            next_hop = ?next_hop,
            interface_index,
            "adding route"
        );
        self.entries.push(RouteEntry {
            prefix,
            length,
            next_hop,
            interface_index,
        });
        Ok(())
    }

    fn find_route(&self, dst: u32) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;
        for entry in &self.entries {
            if matches_prefix(entry.prefix, entry.length, dst)
                && best.map_or(true, |b| entry.length > b.length)
            {
                best = Some(entry);
            }
        }
        best
    }

    /// Drains every interface's ready IPv4 datagrams and forwards each by
    /// longest-prefix match.
    pub fn route(&mut self) {
        let mut to_forward = Vec::new();

        for (idx, iface) in self.interfaces.iter_mut().enumerate() {
            while let Some(mut dgram) = iface.maybe_receive() {
                if dgram.ttl <= 1 {
                    trace!(src_interface = idx, "dropping datagram: ttl expired");
                    continue;
                }
                dgram.ttl -= 1;
                dgram.recompute_checksum();
                to_forward.push(dgram);
            }
        }

        for dgram in to_forward {
            let Some(entry) = self.find_route(dgram.dst.into()) else {
                trace!(dst = %dgram.dst, "dropping unroutable datagram");
                continue;
            };
            let next_hop = entry.next_hop.unwrap_or(dgram.dst);
            let interface_index = entry.interface_index;
            self.interfaces[interface_index].send_datagram(dgram, next_hop);
        }
    }
}

/// True iff the top `length` bits of `prefix` equal the top `length` bits of
/// `dst`. Length 0 matches everything.
fn matches_prefix(prefix: u32, length: u8, dst: u32) -> bool {
    if length == 0 {
        return true;
    }
    if length > 32 {
        return false;
    }
    let shift = 32 - length as u32;
    (prefix >> shift) == (dst >> shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dgram(dst: Ipv4Addr, ttl: u8) -> Ipv4Datagram {
        Ipv4Datagram {
            src: Ipv4Addr::new(192, 168, 0, 1),
            dst,
            ttl,
            checksum: 0,
            payload: Vec::new(),
        }
    }

    fn router_with_three_interfaces() -> Router {
        let mut router = Router::new();
        let if0 = router.add_interface(NetworkInterface::new([0; 6], Ipv4Addr::new(0, 0, 0, 1)));
        let if1 = router.add_interface(NetworkInterface::new([1; 6], Ipv4Addr::new(10, 0, 0, 1)));
        let if2 = router.add_interface(NetworkInterface::new([2; 6], Ipv4Addr::new(10, 1, 0, 1)));
        router.add_route(0, 0, None, if0).unwrap();
        router.add_route(u32::from(Ipv4Addr::new(10, 0, 0, 0)), 8, None, if1).unwrap();
        router.add_route(u32::from(Ipv4Addr::new(10, 1, 0, 0)), 16, None, if2).unwrap();
        router
    }

    #[test]
    fn lpm_picks_longest_matching_prefix() {
        let router = router_with_three_interfaces();
        assert_eq!(router.find_route(u32::from(Ipv4Addr::new(10, 1, 2, 3))).unwrap().interface_index, 2);
        assert_eq!(router.find_route(u32::from(Ipv4Addr::new(10, 2, 0, 1))).unwrap().interface_index, 1);
        assert_eq!(router.find_route(u32::from(Ipv4Addr::new(8, 8, 8, 8))).unwrap().interface_index, 0);
    }

    #[test]
    fn ttl_expiry_drops_datagram() {
        let mut router = router_with_three_interfaces();
        router.interface(1).inject_for_test(dgram(Ipv4Addr::new(10, 0, 0, 5), 1));
        router.route();
        assert!(router.interface(0).maybe_send().is_none());
    }

    #[test]
    fn add_route_rejects_invalid_prefix_length() {
        let mut router = Router::new();
        let if0 = router.add_interface(NetworkInterface::new([0; 6], Ipv4Addr::new(0, 0, 0, 1)));
        assert!(router.add_route(0, 33, None, if0).is_err());
    }

    #[test]
    fn unroutable_datagram_is_dropped() {
        let mut router = Router::new();
        let if0 = router.add_interface(NetworkInterface::new([0; 6], Ipv4Addr::new(0, 0, 0, 1)));
        router.interface(if0).inject_for_test(dgram(Ipv4Addr::new(1, 2, 3, 4), 10));
        router.route();
        assert!(router.interface(if0).maybe_send().is_none());
    }
}

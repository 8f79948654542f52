//! Bridges IP datagrams onto an Ethernet link, performing ARP resolution
//! with pending-queue semantics and cache aging.

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::net::frame::{
    ArpMessage, ArpOpcode, EthernetAddress, EthernetFrame, EthernetPayload, Ipv4Datagram, BROADCAST,
};

pub const ARP_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const ARP_CACHE_TTL_MS: u64 = 30_000;

#[derive(Debug)]
pub struct NetworkInterface {
    ethernet_address: EthernetAddress,
    ip_address: Ipv4Addr,
    clock_ms: u64,
    outbound_frames: VecDeque<EthernetFrame>,
    /// Next-hop IP for each queued IPv4 frame, in the same order.
    outbound_next_hops: VecDeque<Ipv4Addr>,
    /// Sentinel `BROADCAST` means "unresolved, request outstanding".
    arp_cache: HashMap<Ipv4Addr, EthernetAddress>,
    arp_last_action: HashMap<Ipv4Addr, u64>,
    /// IPv4 datagrams handed back by `recv_frame`, staged here so an owning
    /// `Router` can drain them uniformly across every interface in
    /// `Router::route`.
    ready_ipv4: VecDeque<Ipv4Datagram>,
}

impl NetworkInterface {
    pub fn new(ethernet_address: EthernetAddress, ip_address: Ipv4Addr) -> Self {
        debug!(?ethernet_address, %ip_address, "network interface created");
        NetworkInterface {
            ethernet_address,
            ip_address,
            clock_ms: 0,
            outbound_frames: VecDeque::new(),
            outbound_next_hops: VecDeque::new(),
            arp_cache: HashMap::new(),
            arp_last_action: HashMap::new(),
            ready_ipv4: VecDeque::new(),
        }
    }

    pub fn ethernet_address(&self) -> EthernetAddress {
        self.ethernet_address
    }

    pub fn ip_address(&self) -> Ipv4Addr {
        self.ip_address
    }

    fn push_arp(&mut self, opcode: ArpOpcode, target_ip: Ipv4Addr, target_ethernet: EthernetAddress) {
        let msg = ArpMessage {
            opcode,
            sender_ethernet: self.ethernet_address,
            sender_ip: self.ip_address,
            target_ethernet: if target_ethernet == BROADCAST { [0; 6] } else { target_ethernet },
            target_ip,
        };
        let frame = EthernetFrame {
            src: self.ethernet_address,
            dst: target_ethernet,
            payload: EthernetPayload::Arp(msg),
        };
        // ARP takes priority over already-queued IPv4 frames.
        self.outbound_frames.push_front(frame);
    }

    pub fn send_datagram(&mut self, dgram: Ipv4Datagram, next_hop: Ipv4Addr) {
        let should_request = match self.arp_cache.get(&next_hop) {
            None => true,
            // Unresolved and outstanding: duplicate requests within the
            // timeout window are suppressed.
            Some(&eth) if eth == BROADCAST => {
                let last = self.arp_last_action.get(&next_hop).copied().unwrap_or(0);
                self.clock_ms.saturating_sub(last) >= ARP_REQUEST_TIMEOUT_MS
            }
            Some(_) => false,
        };

        if should_request {
            self.push_arp(ArpOpcode::Request, next_hop, BROADCAST);
            self.arp_cache.insert(next_hop, BROADCAST);
            self.arp_last_action.insert(next_hop, self.clock_ms);
        }

        let frame = EthernetFrame {
            src: self.ethernet_address,
            // destination left blank until ARP resolves it in maybe_send.
            dst: [0; 6],
            payload: EthernetPayload::Ipv4(dgram),
        };
        self.outbound_frames.push_back(frame);
        self.outbound_next_hops.push_back(next_hop);
    }

    pub fn recv_frame(&mut self, frame: EthernetFrame) -> Option<Ipv4Datagram> {
        if frame.dst != self.ethernet_address && frame.dst != BROADCAST {
            return None;
        }

        match frame.payload {
            EthernetPayload::Arp(arp) => {
                if arp.target_ip != self.ip_address {
                    return None;
                }
                // Refresh on every receive that confirms the mapping, not
                // just first sight (see DESIGN.md's Open Question decision).
                self.arp_cache.insert(arp.sender_ip, arp.sender_ethernet);
                self.arp_last_action.insert(arp.sender_ip, self.clock_ms);

                if arp.opcode == ArpOpcode::Request {
                    self.push_arp(ArpOpcode::Reply, arp.sender_ip, arp.sender_ethernet);
                }
                None
            }
            EthernetPayload::Ipv4(dgram) => {
                self.ready_ipv4.push_back(dgram.clone());
                Some(dgram)
            }
        }
    }

    /// Pops the next IPv4 datagram handed back by a prior `recv_frame` call.
    /// The owning `Router` is the intended caller; direct users of
    /// `recv_frame`'s return value won't see datagrams duplicated unless
    /// they also drain this queue.
    pub fn maybe_receive(&mut self) -> Option<Ipv4Datagram> {
        self.ready_ipv4.pop_front()
    }

    #[cfg(test)]
    pub(crate) fn inject_for_test(&mut self, dgram: Ipv4Datagram) {
        self.ready_ipv4.push_back(dgram);
    }

    pub fn tick(&mut self, ms_elapsed: u64) {
        self.clock_ms += ms_elapsed;

        let mut to_refresh = Vec::new();
        let mut to_evict = Vec::new();

        for (&ip, &last) in self.arp_last_action.iter() {
            let age = self.clock_ms.saturating_sub(last);
            let unresolved = self.arp_cache.get(&ip).copied() == Some(BROADCAST);
            if unresolved && age >= ARP_REQUEST_TIMEOUT_MS {
                to_refresh.push(ip);
            } else if age >= ARP_CACHE_TTL_MS {
                to_evict.push(ip);
            }
        }

        for ip in to_refresh {
            self.push_arp(ArpOpcode::Request, ip, BROADCAST);
            self.arp_last_action.insert(ip, self.clock_ms);
        }
        for ip in to_evict {
            trace!(%ip, "evicting aged ARP cache entry");
            self.arp_cache.remove(&ip);
            self.arp_last_action.remove(&ip);
        }
    }

    pub fn maybe_send(&mut self) -> Option<EthernetFrame> {
        let head = self.outbound_frames.front()?;
        match &head.payload {
            EthernetPayload::Arp(_) => self.outbound_frames.pop_front(),
            EthernetPayload::Ipv4(_) => {
                let next_hop = *self.outbound_next_hops.front()?;
                match self.arp_cache.get(&next_hop) {
                    Some(&eth) if eth != BROADCAST => {
                        let mut frame = self.outbound_frames.pop_front().unwrap();
                        self.outbound_next_hops.pop_front();
                        frame.dst = eth;
                        Some(frame)
                    }
                    // Head-of-line blocked waiting on ARP resolution.
                    _ => None,
                }
            }
        }
    }
}

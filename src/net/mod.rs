pub mod frame;
pub mod interface;
pub mod router;

pub use frame::{ArpMessage, ArpOpcode, EthernetAddress, EthernetFrame, EthernetPayload, Ipv4Datagram, BROADCAST};
pub use interface::{NetworkInterface, ARP_CACHE_TTL_MS, ARP_REQUEST_TIMEOUT_MS};
pub use router::{RouteEntry, Router};

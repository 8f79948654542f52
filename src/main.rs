//! Demo binary: brings up one TUN device as a routed interface and pumps
//! frames between the raw socket and the pure `Router`/`NetworkInterface`
//! core. Generalized from a single hardcoded connection table to the
//! router/interface core this crate builds — everything past
//! `Router::route` stays pure and untouched by device I/O.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};

use mtcp::device::Device;
use mtcp::net::{EthernetAddress, NetworkInterface, Router};
use mtcp::CoreError;

/// Minimal router demo: one TUN interface, one default route.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Name of the TUN device to open (created if missing, needs CAP_NET_ADMIN).
    #[arg(long, default_value = "tun0")]
    tun_name: String,

    /// IPv4 address to bind to this interface.
    #[arg(long, default_value = "10.0.0.1")]
    ip_address: Ipv4Addr,

    /// Locally administered Ethernet address for the interface.
    #[arg(long, default_value = "02:00:00:00:00:01", value_parser = parse_mac)]
    mac_address: EthernetAddress,

    /// How often the main loop advances the interface clock, in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
}

fn parse_mac(s: &str) -> Result<EthernetAddress, String> {
    let mut addr = [0u8; 6];
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return Err(format!("expected 6 colon-separated octets, got {}", parts.len()));
    }
    for (slot, part) in addr.iter_mut().zip(parts) {
        *slot = u8::from_str_radix(part, 16).map_err(|e| e.to_string())?;
    }
    Ok(addr)
}

fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let device = Device::new(&cli.tun_name)?;
    let interface = NetworkInterface::new(cli.mac_address, cli.ip_address);

    let mut router = Router::new();
    let if_index = router.add_interface(interface);
    // Default route: everything not otherwise matched goes out this interface
    // with the datagram's own destination as the next hop (directly attached).
    router.add_route(0, 0, None, if_index)?;

    info!(tun = %cli.tun_name, ip = %cli.ip_address, "interface up");

    run_loop(device, router, if_index, Duration::from_millis(cli.tick_ms))
}

fn run_loop(mut device: Device, mut router: Router, if_index: usize, tick: Duration) -> Result<(), CoreError> {
    let mut last_tick = Instant::now();
    loop {
        match device.recv_frame() {
            Ok(Some(frame)) => {
                router.interface(if_index).recv_frame(frame);
            }
            Ok(None) => {}
            Err(err) => {
                error!(%err, "device read failed");
                return Err(CoreError::Io(err));
            }
        }

        router.route();

        while let Some(frame) = router.interface(if_index).maybe_send() {
            device.send_frame(&frame)?;
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick {
            router.interface(if_index).tick(elapsed.as_millis() as u64);
            last_tick = Instant::now();
        }
    }
}

//! Core of a user-space TCP/IP stack: a bounded byte pipe, wraparound
//! sequence arithmetic, out-of-order reassembly, a TCP sender/receiver
//! pair, an ARP-mediated network interface, and a longest-prefix-match
//! router. The core is single-threaded and synchronous — every operation
//! is invoked explicitly by an owning driver (`device`, a test harness, or
//! a threaded supervisor); nothing here blocks or spawns.

pub mod bytestream;
pub mod device;
pub mod error;
pub mod net;
pub mod reassembler;
pub mod tcp;
pub mod wrapping;

pub use bytestream::{ByteStream, Readiness};
pub use error::CoreError;
pub use reassembler::Reassembler;
pub use wrapping::Wrap32;

//! The few failures that aren't silent drops: malformed segments,
//! out-of-window bytes, impossible acks, TTL expiry, and unroutable
//! datagrams all stay a value, never an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("interface index {0} out of range")]
    InterfaceIndexOutOfRange(usize),

    #[error("route prefix length {0} exceeds 32 bits")]
    InvalidPrefixLength(u8),

    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

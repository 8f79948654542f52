//! Wire-level message shapes exchanged between a `TCPSender` and its peer's
//! `TCPReceiver`. Encoding to/from actual TCP segment bytes is a collaborator
//! concern — these are the in-memory shapes the core operates on.

use crate::wrapping::Wrap32;

/// Typical payload cap, chosen to keep a full segment under a standard
/// Ethernet MTU once IP/TCP headers are added.
pub const MAX_PAYLOAD_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TCPSenderMessage {
    pub seqno: Wrap32,
    pub syn: bool,
    pub payload: Vec<u8>,
    pub fin: bool,
}

impl TCPSenderMessage {
    pub fn sequence_length(&self) -> u64 {
        self.syn as u64 + self.payload.len() as u64 + self.fin as u64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TCPReceiverMessage {
    pub ackno: Option<Wrap32>,
    pub window_size: u16,
}

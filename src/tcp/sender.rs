//! Produces outgoing segments from a `ByteStream`, tracks in-flight bytes,
//! and drives the retransmission timer with exponential backoff.

use std::collections::BTreeMap;

use rand::RngCore;
use tracing::trace;

use crate::bytestream::{read_stream, Reader};
use crate::tcp::message::{TCPReceiverMessage, TCPSenderMessage, MAX_PAYLOAD_SIZE};
use crate::wrapping::Wrap32;

#[derive(Debug)]
struct OutstandingSegment {
    msg: TCPSenderMessage,
    sent: bool,
}

#[derive(Debug)]
struct Timer {
    rto: u64,
    elapsed: u64,
    running: bool,
}

impl Timer {
    fn start(&mut self) {
        self.running = true;
        self.elapsed = 0;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Debug)]
pub struct TCPSender {
    isn: Wrap32,
    initial_rto_ms: u64,
    /// Absolute seqno of the next byte to be assigned a sequence number.
    cur_abs_ackno: u64,
    cur_window: u16,
    retransmission_count: u32,
    finished: bool,
    timer: Timer,
    outstanding: BTreeMap<u64, OutstandingSegment>,
}

impl TCPSender {
    pub fn new(initial_rto_ms: u64, fixed_isn: Option<Wrap32>) -> Self {
        let isn = fixed_isn.unwrap_or_else(|| Wrap32::new(rand::thread_rng().next_u32()));
        TCPSender {
            isn,
            initial_rto_ms,
            cur_abs_ackno: 0,
            cur_window: 1,
            retransmission_count: 0,
            finished: false,
            timer: Timer {
                rto: initial_rto_ms,
                elapsed: 0,
                running: false,
            },
            outstanding: BTreeMap::new(),
        }
    }

    pub fn sequence_numbers_in_flight(&self) -> u64 {
        let Some(&begin) = self.outstanding.keys().next() else {
            return 0;
        };
        let (&last_key, last_seg) = self.outstanding.iter().next_back().unwrap();
        last_key + last_seg.msg.sequence_length() - begin
    }

    pub fn consecutive_retransmissions(&self) -> u32 {
        self.retransmission_count
    }

    pub fn push(&mut self, outbound_reader: &mut Reader<'_>) {
        if self.finished {
            return;
        }

        let window = if self.cur_window == 0 { 1 } else { self.cur_window as u64 };
        let mut remaining = window.saturating_sub(self.sequence_numbers_in_flight());

        // Stream already finished with nothing drained yet this call: emit a
        // bare FIN directly rather than falling into the per-segment loop.
        if outbound_reader.is_finished() && remaining >= 1 {
            let syn = self.cur_abs_ackno == 0;
            let msg = TCPSenderMessage {
                seqno: Wrap32::wrap(self.cur_abs_ackno, self.isn),
                syn,
                payload: Vec::new(),
                fin: true,
            };
            let seq_len = msg.sequence_length();
            self.outstanding.insert(self.cur_abs_ackno, OutstandingSegment { msg, sent: false });
            self.cur_abs_ackno += seq_len;
            self.finished = true;
            return;
        }

        loop {
            if remaining == 0 {
                break;
            }
            let syn = self.cur_abs_ackno == 0;
            let syn_cost = syn as u64;
            let msg_budget = remaining
                .min(MAX_PAYLOAD_SIZE as u64 + syn_cost)
                .min(outbound_reader.bytes_buffered() as u64 + syn_cost);

            if msg_budget == 0 {
                break;
            }

            let payload_len = (msg_budget - syn_cost) as usize;
            let mut payload = Vec::with_capacity(payload_len);
            read_stream(outbound_reader, payload_len, &mut payload);

            let mut seq_len = msg_budget;
            let fin = outbound_reader.is_finished() && remaining - msg_budget >= 1;
            if fin {
                self.finished = true;
                seq_len += 1;
            }

            let msg = TCPSenderMessage {
                seqno: Wrap32::wrap(self.cur_abs_ackno, self.isn),
                syn,
                payload,
                fin,
            };
            self.outstanding.insert(self.cur_abs_ackno, OutstandingSegment { msg, sent: false });
            self.cur_abs_ackno += seq_len;
            remaining -= seq_len;
        }
    }

    pub fn maybe_send(&mut self) -> Option<TCPSenderMessage> {
        if self.outstanding.is_empty() {
            return None;
        }
        let running = self.timer.running;
        for seg in self.outstanding.values_mut() {
            if !seg.sent {
                if !running {
                    self.timer.start();
                }
                seg.sent = true;
                return Some(seg.msg.clone());
            }
        }
        None
    }

    pub fn send_empty_message(&self) -> TCPSenderMessage {
        TCPSenderMessage {
            seqno: Wrap32::wrap(self.cur_abs_ackno, self.isn),
            syn: false,
            payload: Vec::new(),
            fin: false,
        }
    }

    pub fn receive(&mut self, msg: &TCPReceiverMessage) {
        self.cur_window = msg.window_size;

        let Some(ackno) = msg.ackno else {
            return;
        };
        if self.outstanding.is_empty() {
            return;
        }

        let abs_ack = ackno.unwrap(self.isn, self.cur_abs_ackno);
        let (&last_key, last_seg) = self.outstanding.iter().next_back().unwrap();
        let highest_end = last_key + last_seg.msg.sequence_length();
        if abs_ack > highest_end {
            trace!("ignoring ack beyond highest outstanding end");
            return;
        }

        let to_remove: Vec<u64> = self
            .outstanding
            .iter()
            .filter(|(&first, seg)| first + seg.msg.sequence_length() <= abs_ack)
            .map(|(&first, _)| first)
            .collect();

        if !to_remove.is_empty() {
            for key in to_remove {
                self.outstanding.remove(&key);
            }
            self.timer.stop();
            self.timer.rto = self.initial_rto_ms;
            if !self.outstanding.is_empty() {
                self.timer.start();
            }
            self.retransmission_count = 0;
        }
    }

    pub fn tick(&mut self, ms_elapsed: u64) {
        if self.timer.running {
            self.timer.elapsed += ms_elapsed;
        }

        if self.timer.elapsed >= self.timer.rto {
            if let Some((_, seg)) = self.outstanding.iter_mut().next() {
                seg.sent = false;
            }

            if self.cur_window != 0 {
                self.retransmission_count += 1;
                self.timer.rto *= 2;
            }

            self.timer.stop();
            self.timer.start();
        }
    }
}

//! Translates incoming segments into reassembler inserts and reports
//! acknowledgements/window back to the peer's sender.

use tracing::trace;

use crate::bytestream::Writer;
use crate::reassembler::Reassembler;
use crate::tcp::message::{TCPReceiverMessage, TCPSenderMessage};
use crate::wrapping::Wrap32;

#[derive(Debug, Default)]
pub struct TCPReceiver {
    isn: Option<Wrap32>,
    fin_seen: bool,
}

impl TCPReceiver {
    pub fn new() -> Self {
        TCPReceiver::default()
    }

    pub fn receive(
        &mut self,
        segment: TCPSenderMessage,
        reassembler: &mut Reassembler,
        inbound_writer: &mut Writer<'_>,
    ) {
        if segment.syn {
            self.isn = Some(segment.seqno);
        }

        let Some(isn) = self.isn else {
            trace!("dropping segment received before SYN");
            return;
        };

        if segment.fin {
            self.fin_seen = true;
        }

        let checkpoint = inbound_writer.bytes_pushed() + 1;
        let abs_seqno = segment.seqno.unwrap(isn, checkpoint);
        // stream index of the first payload byte: abs_seqno - 1 + SYN.
        // Saturates rather than underflows on a malformed non-SYN segment
        // whose unwrapped seqno lands at 0 (dropped harmlessly below: index
        // 0 is either already consumed or within-window, never panics).
        let stream_index = (abs_seqno + segment.syn as u64).saturating_sub(1);

        reassembler.insert(stream_index, &segment.payload, segment.fin, inbound_writer);
    }

    pub fn send(&self, inbound_writer: &Writer<'_>) -> TCPReceiverMessage {
        let ackno = self.isn.map(|isn| {
            let extra_fin = self.fin_seen && inbound_writer.is_closed();
            Wrap32::wrap(inbound_writer.bytes_pushed() + 1 + extra_fin as u64, isn)
        });
        let window_size = inbound_writer.available_capacity().min(u16::MAX as usize) as u16;

        TCPReceiverMessage { ackno, window_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytestream::ByteStream;

    fn syn(seqno: u32) -> TCPSenderMessage {
        TCPSenderMessage {
            seqno: Wrap32::new(seqno),
            syn: true,
            payload: Vec::new(),
            fin: false,
        }
    }

    #[test]
    fn segment_before_syn_is_dropped() {
        let mut bs = ByteStream::new(16);
        let mut reassembler = Reassembler::new();
        let mut recv = TCPReceiver::new();

        let msg = TCPSenderMessage {
            seqno: Wrap32::new(5),
            syn: false,
            payload: b"hi".to_vec(),
            fin: false,
        };
        recv.receive(msg, &mut reassembler, &mut bs.writer());
        assert_eq!(bs.reader().bytes_buffered(), 0);
        assert_eq!(recv.send(&bs.writer()).ackno, None);
    }

    #[test]
    fn syn_then_data_then_fin_round_trip() {
        let mut bs = ByteStream::new(16);
        let mut reassembler = Reassembler::new();
        let mut recv = TCPReceiver::new();

        recv.receive(syn(100), &mut reassembler, &mut bs.writer());
        let ackno = recv.send(&bs.writer()).ackno.unwrap();
        assert_eq!(ackno, Wrap32::new(101));

        let data_msg = TCPSenderMessage {
            seqno: Wrap32::new(101),
            syn: false,
            payload: b"hello".to_vec(),
            fin: false,
        };
        recv.receive(data_msg, &mut reassembler, &mut bs.writer());
        assert_eq!(bs.reader().peek(), b"hello");
        let ackno = recv.send(&bs.writer()).ackno.unwrap();
        assert_eq!(ackno, Wrap32::new(106));

        let fin_msg = TCPSenderMessage {
            seqno: Wrap32::new(106),
            syn: false,
            payload: Vec::new(),
            fin: true,
        };
        recv.receive(fin_msg, &mut reassembler, &mut bs.writer());
        assert!(bs.writer().is_closed());
        bs.reader().pop(5);
        let ackno = recv.send(&bs.writer()).ackno.unwrap();
        assert_eq!(ackno, Wrap32::new(107));
    }

    #[test]
    fn window_size_reflects_available_capacity() {
        let mut bs = ByteStream::new(4);
        let mut reassembler = Reassembler::new();
        let mut recv = TCPReceiver::new();
        recv.receive(syn(0), &mut reassembler, &mut bs.writer());
        assert_eq!(recv.send(&bs.writer()).window_size, 4);
    }
}

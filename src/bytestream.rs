//! A bounded, single-producer/single-consumer byte FIFO.
//!
//! `ByteStream` owns the buffer; `Reader` and `Writer` are capability views
//! over it rather than independent objects, so there is exactly one owner
//! of the backing storage.

use std::collections::VecDeque;

use bitflags::bitflags;

bitflags! {
    /// What a capability view is ready to do right now. Mirrors the
    /// teacher's `Available` readiness set reported from its connection's
    /// `on_packet`/poll path; here it's reported directly off `Reader`/
    /// `Writer` since this crate's core has no poll loop of its own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Readiness: u8 {
        const READABLE = 0b01;
        const WRITABLE = 0b10;
    }
}

/// A bounded byte pipe shared between one writer and one reader.
#[derive(Debug)]
pub struct ByteStream {
    capacity: usize,
    buffer: VecDeque<u8>,
    closed: bool,
    error: bool,
    bytes_pushed: u64,
    bytes_popped: u64,
}

impl ByteStream {
    pub fn new(capacity: usize) -> Self {
        ByteStream {
            capacity,
            buffer: VecDeque::new(),
            closed: false,
            error: false,
            bytes_pushed: 0,
            bytes_popped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the write side.
    pub fn writer(&mut self) -> Writer<'_> {
        Writer(self)
    }

    /// Borrow the read side.
    pub fn reader(&mut self) -> Reader<'_> {
        Reader(self)
    }

    fn bytes_buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Write-side capability over a `ByteStream`.
pub struct Writer<'a>(&'a mut ByteStream);

impl Writer<'_> {
    /// Appends as much of `data` as available capacity allows; excess bytes
    /// are silently dropped. A no-op once the stream is closed or full.
    pub fn push(&mut self, data: &[u8]) {
        if data.is_empty() || self.0.closed {
            return;
        }
        let room = self.available_capacity();
        let to_push = data.len().min(room);
        self.0.buffer.extend(&data[..to_push]);
        self.0.bytes_pushed += to_push as u64;
    }

    pub fn close(&mut self) {
        self.0.closed = true;
    }

    pub fn set_error(&mut self) {
        self.0.error = true;
    }

    pub fn is_closed(&self) -> bool {
        self.0.closed
    }

    pub fn available_capacity(&self) -> usize {
        self.0.capacity - self.0.bytes_buffered()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.0.bytes_pushed
    }

    pub fn capacity(&self) -> usize {
        self.0.capacity
    }

    /// `WRITABLE` iff there's room and the stream isn't closed.
    pub fn readiness(&self) -> Readiness {
        let mut avail = Readiness::empty();
        if !self.0.closed && self.available_capacity() > 0 {
            avail |= Readiness::WRITABLE;
        }
        avail
    }
}

/// Read-side capability over a `ByteStream`.
pub struct Reader<'a>(&'a mut ByteStream);

impl Reader<'_> {
    /// A view over the next buffered bytes. Empty iff nothing is buffered.
    /// Returned as an owned `Vec` since the backing `VecDeque` isn't
    /// guaranteed contiguous; callers that want a zero-copy peek over the
    /// contiguous prefix should use [`Reader::peek_contiguous`].
    pub fn peek(&self) -> Vec<u8> {
        self.0.buffer.iter().copied().collect()
    }

    /// The contiguous prefix of the buffer, without copying past the first
    /// internal ring-buffer segment. May be shorter than `bytes_buffered()`.
    pub fn peek_contiguous(&self) -> &[u8] {
        self.0.buffer.as_slices().0
    }

    /// Removes exactly `n` bytes. `n` must not exceed `bytes_buffered()`.
    pub fn pop(&mut self, n: usize) {
        debug_assert!(n <= self.0.buffer.len());
        let n = n.min(self.0.buffer.len());
        self.0.buffer.drain(..n);
        self.0.bytes_popped += n as u64;
    }

    pub fn is_finished(&self) -> bool {
        self.0.closed && self.0.buffer.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.0.error
    }

    pub fn bytes_buffered(&self) -> usize {
        self.0.buffer.len()
    }

    pub fn bytes_popped(&self) -> u64 {
        self.0.bytes_popped
    }

    pub fn is_closed(&self) -> bool {
        self.0.closed
    }

    /// `READABLE` iff there are buffered bytes, or the stream closed with
    /// nothing left to read (so a caller polling for EOF sees it once).
    pub fn readiness(&self) -> Readiness {
        let mut avail = Readiness::empty();
        if self.bytes_buffered() > 0 || self.is_finished() {
            avail |= Readiness::READABLE;
        }
        avail
    }
}

/// Peeks and pops up to `len` bytes from `reader`, appending them to `out`.
/// Stops early if the stream runs dry.
pub fn read_stream(reader: &mut Reader<'_>, len: usize, out: &mut Vec<u8>) {
    let mut remaining = len;
    while remaining > 0 {
        let chunk = reader.peek_contiguous();
        if chunk.is_empty() {
            break;
        }
        let take = remaining.min(chunk.len());
        out.extend_from_slice(&chunk[..take]);
        reader.pop(take);
        remaining -= take;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_scenario() {
        let mut bs = ByteStream::new(15);
        bs.writer().push(b"cat");
        assert_eq!(bs.writer().bytes_pushed(), 3);
        assert_eq!(bs.reader().bytes_buffered(), 3);
        assert_eq!(bs.reader().peek(), b"cat");

        bs.reader().pop(2);
        assert_eq!(bs.reader().peek(), b"t");
        assert_eq!(bs.reader().bytes_popped(), 2);

        bs.writer().push(b"tail");
        assert!(bs.reader().peek().starts_with(b"ttail"));

        bs.writer().close();
        bs.reader().pop(5);
        assert!(bs.reader().is_finished());
    }

    #[test]
    fn push_truncates_to_capacity() {
        let mut bs = ByteStream::new(3);
        bs.writer().push(b"abcdef");
        assert_eq!(bs.writer().bytes_pushed(), 3);
        assert_eq!(bs.writer().available_capacity(), 0);
        assert_eq!(bs.reader().peek(), b"abc");
    }

    #[test]
    fn push_after_close_is_noop() {
        let mut bs = ByteStream::new(4);
        bs.writer().close();
        bs.writer().push(b"x");
        assert_eq!(bs.writer().bytes_pushed(), 0);
        assert!(bs.reader().is_finished());
    }

    #[test]
    fn error_flag_is_observable() {
        let mut bs = ByteStream::new(4);
        bs.writer().set_error();
        assert!(bs.reader().has_error());
    }

    #[test]
    fn readiness_tracks_buffered_bytes_and_closure() {
        let mut bs = ByteStream::new(4);
        assert_eq!(bs.reader().readiness(), Readiness::empty());
        assert_eq!(bs.writer().readiness(), Readiness::WRITABLE);

        bs.writer().push(b"ab");
        assert_eq!(bs.reader().readiness(), Readiness::READABLE);

        bs.writer().push(b"cd");
        assert_eq!(bs.writer().readiness(), Readiness::empty());

        bs.reader().pop(4);
        bs.writer().close();
        assert_eq!(bs.reader().readiness(), Readiness::READABLE);
        assert_eq!(bs.writer().readiness(), Readiness::empty());
    }

    #[test]
    fn read_stream_helper_drains_across_pushes() {
        let mut bs = ByteStream::new(8);
        bs.writer().push(b"hello");
        let mut out = Vec::new();
        {
            let mut r = bs.reader();
            read_stream(&mut r, 10, &mut out);
        }
        assert_eq!(out, b"hello");
        assert_eq!(bs.reader().bytes_buffered(), 0);
    }
}

//! Out-of-order stream reassembly over a bounded `ByteStream` writer.

use std::collections::BTreeMap;

use crate::bytestream::Writer;

/// Accepts out-of-order, possibly overlapping byte ranges addressed by
/// absolute stream index, and delivers in-order bytes into a `ByteStream`.
#[derive(Debug, Default)]
pub struct Reassembler {
    /// Scratch buffer, one byte per index starting at `writer.bytes_pushed()`
    /// at the time it was allocated; lazily sized to the writer's capacity.
    scratch: Vec<u8>,
    /// Pending, non-adjacent, non-overlapping intervals: first index -> last
    /// index (inclusive), both absolute.
    pending: BTreeMap<u64, u64>,
    pending_bytes: u64,
    /// Last absolute index of the closing substring, if seen.
    terminal_index: Option<u64>,
}

impl Reassembler {
    pub fn new() -> Self {
        Reassembler::default()
    }

    /// Bytes currently held in pending (undelivered) intervals.
    pub fn bytes_pending(&self) -> u64 {
        self.pending_bytes
    }

    pub fn insert(&mut self, first_index: u64, data: &[u8], is_last: bool, writer: &mut Writer<'_>) {
        if self.scratch.is_empty() {
            self.scratch = vec![0u8; writer.capacity()];
        }

        let pushed = writer.bytes_pushed();
        let window_end = pushed + writer.available_capacity() as u64;

        if is_last {
            self.terminal_index = Some(first_index + data.len() as u64);
        }

        if data.is_empty() {
            if is_last && first_index == pushed {
                writer.close();
            }
            return;
        }

        let l = first_index.max(pushed);
        let r = (first_index + data.len() as u64).min(window_end);
        // [l, r) is the half-open acceptance window; empty if l >= r.
        if l >= r {
            return;
        }
        let r_incl = r - 1;

        for idx in l..r {
            let scratch_off = (idx - pushed) as usize;
            if scratch_off < self.scratch.len() {
                self.scratch[scratch_off] = data[(idx - first_index) as usize];
            }
        }

        let (mut merged_l, mut merged_r) = (l, r_incl);
        loop {
            let mut merged_any = false;

            // Interval starting at or after merged_l that touches/overlaps.
            if let Some((&start, &end)) = self.pending.range(merged_l..).next() {
                if start <= merged_r + 1 {
                    merged_r = merged_r.max(end);
                    self.pending_bytes -= end - start + 1;
                    self.pending.remove(&start);
                    merged_any = true;
                }
            }

            // Interval ending at or after merged_l - 1, starting before it.
            if let Some((&start, &end)) = self.pending.range(..merged_l).next_back() {
                if end + 1 >= merged_l {
                    merged_l = start;
                    merged_r = merged_r.max(end);
                    self.pending_bytes -= end - start + 1;
                    self.pending.remove(&start);
                    merged_any = true;
                }
            }

            if !merged_any {
                break;
            }
        }

        if merged_l == pushed {
            let old_bias = pushed;
            let len = (merged_r - merged_l + 1) as usize;
            writer.push(&self.scratch[..len]);
            let new_pushed = writer.bytes_pushed();

            if self.terminal_index == Some(merged_r + 1) {
                writer.close();
            }

            // Shift remaining pending intervals' scratch bytes to stay
            // consistent with the new bias.
            let shift = (new_pushed - old_bias) as usize;
            if shift > 0 && shift < self.scratch.len() {
                self.scratch.copy_within(shift.., 0);
            }
        } else {
            self.pending.insert(merged_l, merged_r);
            self.pending_bytes += merged_r - merged_l + 1;
        }
    }
}

//! 32-bit TCP sequence-number arithmetic.

use std::fmt;
use std::ops::Add;

/// A 32-bit sequence number that wraps modulo 2^32, as used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wrap32(u32);

impl Wrap32 {
    pub fn new(raw: u32) -> Self {
        Wrap32(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// `wrap(n, zero_point) = zero_point + (n mod 2^32)`.
    pub fn wrap(n: u64, zero_point: Wrap32) -> Wrap32 {
        Wrap32(zero_point.0.wrapping_add(n as u32))
    }

    /// The absolute 64-bit value `A` such that `wrap(A, zero_point) == self`
    /// and `|A - checkpoint|` is minimized, ties broken toward the lower `A`
    /// (never negative).
    pub fn unwrap(self, zero_point: Wrap32, checkpoint: u64) -> u64 {
        const CYCLE: u64 = 1u64 << 32;
        let diff = self.0.wrapping_sub(zero_point.0) as u64;
        let n_cycle = checkpoint / CYCLE;

        let middle = n_cycle * CYCLE + diff;
        let upper = (n_cycle + 1) * CYCLE + diff;
        let lower = if n_cycle == 0 {
            None
        } else {
            Some((n_cycle - 1) * CYCLE + diff)
        };

        // Candidates in increasing order; first-seen-wins on a tie picks the
        // lowest A, as required.
        let mut candidates = Vec::with_capacity(3);
        if let Some(lower) = lower {
            candidates.push(lower);
        }
        candidates.push(middle);
        candidates.push(upper);

        let mut best = candidates[0];
        let mut best_dist = abs_diff(best, checkpoint);
        for &candidate in &candidates[1..] {
            let d = abs_diff(candidate, checkpoint);
            if d < best_dist {
                best = candidate;
                best_dist = d;
            }
        }

        best
    }
}

fn abs_diff(a: u64, b: u64) -> u64 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

impl Add<u32> for Wrap32 {
    type Output = Wrap32;
    fn add(self, rhs: u32) -> Wrap32 {
        Wrap32(self.0.wrapping_add(rhs))
    }
}

impl Add<u64> for Wrap32 {
    type Output = Wrap32;
    fn add(self, rhs: u64) -> Wrap32 {
        Wrap32(self.0.wrapping_add(rhs as u32))
    }
}

impl fmt::Display for Wrap32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True iff `lhs` precedes `rhs` in the circular 32-bit sequence space.
pub fn wrapping_lt(lhs: u32, rhs: u32) -> bool {
    lhs.wrapping_sub(rhs) > u32::MAX >> 1
}

/// True iff `x` lies strictly between `start` and `end` in the circular
/// sequence space.
pub fn is_between_wrapped(start: u32, x: u32, end: u32) -> bool {
    wrapping_lt(start, x) && wrapping_lt(x, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_near_checkpoint() {
        let zp = Wrap32::new(1000);
        let a: u64 = 10_000;
        let wrapped = Wrap32::wrap(a, zp);
        assert_eq!(wrapped.unwrap(zp, a), a);
    }

    #[test]
    fn round_trip_within_2_31_of_checkpoint() {
        let zp = Wrap32::new(384);
        let a: u64 = 5_000_000_000;
        let wrapped = Wrap32::wrap(a, zp);
        assert_eq!(wrapped.unwrap(zp, a), a);
        // checkpoint offset by less than 2^31 still recovers A.
        assert_eq!(wrapped.unwrap(zp, a + 1000), a);
    }

    #[test]
    fn wrap_unwrap_near_zero() {
        let isn = Wrap32::new(u32::MAX);
        let wrapped = Wrap32::wrap(1, isn);
        assert_eq!(wrapped, Wrap32::new(0));
        assert_eq!(wrapped.unwrap(isn, 0), 1);
        assert_eq!(wrapped.unwrap(isn, 1u64 << 33), 1 + (1u64 << 32));
    }

    #[test]
    fn unwrap_never_negative() {
        let zp = Wrap32::new(0);
        let wrapped = Wrap32::new(u32::MAX);
        // checkpoint 0: nearest non-negative candidate is u32::MAX, not -1.
        assert_eq!(wrapped.unwrap(zp, 0), u32::MAX as u64);
    }
}

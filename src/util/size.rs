//! Byte quantities.

use std::fmt;

/// Convert kilobytes to bytes.
#[inline]
pub const fn kb(n: usize) -> usize {
    n * 1024
}

/// A byte count that displays in the largest whole unit (B, KiB, MiB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub usize);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(&str, usize); 2] = [("MiB", 1 << 20), ("KiB", 1 << 10)];

        for (unit, scale) in UNITS {
            if self.0 >= scale {
                return write!(f, "{:.2} {}", self.0 as f64 / scale as f64, unit);
            }
        }
        write!(f, "{} B", self.0)
    }
}

//! Atomic counters shared by the resource implementations.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Monotonic event counter (allocations, fallbacks, ...).
pub struct EventCounter(AtomicU64);

impl EventCounter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment and return the value before the increment.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl Default for EventCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Live byte count with a high-water mark.
pub struct ByteGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ByteGauge {
    pub const fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Add bytes, raising the peak if needed.
    pub fn grow(&self, bytes: usize) {
        let now = self.current.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let mut peak = self.peak.load(Ordering::Relaxed);
        while now > peak {
            match self
                .peak
                .compare_exchange_weak(peak, now, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    pub fn shrink(&self, bytes: usize) {
        self.current.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

impl Default for ByteGauge {
    fn default() -> Self {
        Self::new()
    }
}

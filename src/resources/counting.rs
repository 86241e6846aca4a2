//! Counting decorator with an optional allocation limit.
//!
//! Used to verify that value types leave nothing behind: after a failed
//! construction the outstanding count must be back where it started.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::api::stats::ResourceStats;
use crate::diagnostics::{self, PM002};
use crate::error::{AllocError, Result};
use crate::resources::MemoryResource;
use crate::sync::atomics::{ByteGauge, EventCounter};

/// Wraps a resource and keeps allocation accounting.
pub struct CountingResource<R> {
    inner: R,
    /// Successful allocations allowed before requests start failing
    limit: Option<u64>,
    allocations: EventCounter,
    deallocations: EventCounter,
    refused: EventCounter,
    bytes: ByteGauge,
}

impl<R: MemoryResource> CountingResource<R> {
    /// Count allocations without limiting them.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            limit: None,
            allocations: EventCounter::new(),
            deallocations: EventCounter::new(),
            refused: EventCounter::new(),
            bytes: ByteGauge::new(),
        }
    }

    /// Allow `limit` successful allocations; every later one fails with
    /// [`AllocError::OutOfMemory`].
    pub fn with_limit(inner: R, limit: u64) -> Self {
        let mut this = Self::new(inner);
        this.limit = Some(limit);
        this
    }

    /// The wrapped resource.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Allocations not yet returned.
    pub fn outstanding(&self) -> u64 {
        self.allocations.get() - self.deallocations.get()
    }

    /// Get current statistics.
    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            allocation_count: self.allocations.get(),
            deallocation_count: self.deallocations.get(),
            refused_count: self.refused.get(),
            bytes_outstanding: self.bytes.current(),
            peak_bytes: self.bytes.peak(),
        }
    }
}

// SAFETY: storage is obtained from and returned to `inner` unchanged.
unsafe impl<R: MemoryResource> MemoryResource for CountingResource<R> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        if let Some(limit) = self.limit {
            if self.allocations.get() >= limit {
                self.refused.bump();
                diagnostics::emit_with_context(&PM002, format_args!("limit of {} reached", limit));
                return Err(AllocError::out_of_memory(layout));
            }
        }

        let ptr = self.inner.allocate(layout)?;
        self.allocations.bump();
        self.bytes.grow(layout.size());
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
        self.deallocations.bump();
        self.bytes.shrink(layout.size());
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        self.inner.is_equal(other)
    }
}

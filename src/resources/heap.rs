//! Global heap resource.

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

use crate::error::{AllocError, Result};
use crate::resources::MemoryResource;
use crate::sync::atomics::{ByteGauge, EventCounter};
use crate::util::layout::storage_layout;

/// Resource backed by the global allocator.
///
/// This is what the default-resource slot falls back to when nothing else
/// is installed. Separate instances are separate identities even though
/// they share the global heap underneath.
pub struct NewDeleteResource {
    /// Bytes currently handed out
    allocated: ByteGauge,

    /// Total allocation count
    allocation_count: EventCounter,
}

static NEW_DELETE: NewDeleteResource = NewDeleteResource::new();

/// The process-wide heap resource.
pub fn new_delete_resource() -> &'static NewDeleteResource {
    &NEW_DELETE
}

impl NewDeleteResource {
    /// Create a new heap resource.
    pub const fn new() -> Self {
        Self {
            allocated: ByteGauge::new(),
            allocation_count: EventCounter::new(),
        }
    }

    /// Get total bytes currently allocated through this instance.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.current()
    }

    /// Get total allocation count.
    pub fn allocation_count(&self) -> u64 {
        self.allocation_count.get()
    }
}

impl Default for NewDeleteResource {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: storage comes from the global allocator with the widened layout
// and is returned to it with the same layout.
unsafe impl MemoryResource for NewDeleteResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        let layout = storage_layout(layout);

        // SAFETY: storage_layout never yields a zero size.
        let ptr = unsafe { alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| AllocError::out_of_memory(layout))?;

        self.allocated.grow(layout.size());
        self.allocation_count.bump();
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let layout = storage_layout(layout);

        // Poison memory before freeing in debug mode
        #[cfg(feature = "debug")]
        std::ptr::write_bytes(ptr.as_ptr(), 0xCD, layout.size());

        dealloc(ptr.as_ptr(), layout);
        self.allocated.shrink(layout.size());
    }
}

//! Buffered arena - bump allocation from a fixed buffer with a fallback.
//!
//! Individual frees of arena storage are no-ops; the buffer is reclaimed
//! when the arena goes away (or on [`BufferedArenaResource::release`]).

use std::alloc::{alloc, dealloc, Layout};
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::api::config::ResourceConfig;
use crate::diagnostics::{self, PM001};
use crate::error::{AllocError, Result};
use crate::resources::MemoryResource;
use crate::sync::atomics::EventCounter;
use crate::sync::mutex::Mutex;
use crate::util::layout::{padding_at, storage_layout};
use crate::util::size::ByteSize;

/// Serves allocations sequentially from a buffer, then from `fallback`.
///
/// Exhaustion is not an error: once the buffer cannot fit a request the
/// request goes to the fallback resource. Storage already handed out from
/// the buffer is never reused while the arena lives.
pub struct BufferedArenaResource<'b, R> {
    /// Base pointer of the buffer
    base: NonNull<u8>,

    /// Buffer length in bytes
    capacity: usize,

    /// Current allocation head (offset from base)
    head: Mutex<usize>,

    /// Layout of the buffer when the arena allocated it itself
    owned: Option<Layout>,

    /// Allocations that went to the fallback
    fallbacks: EventCounter,

    fallback: R,
    _buffer: PhantomData<&'b mut [u8]>,
}

// SAFETY: the buffer is exclusively borrowed (or owned) for 'b and the
// head is only advanced under the mutex.
unsafe impl<'b, R: Send> Send for BufferedArenaResource<'b, R> {}
unsafe impl<'b, R: Sync> Sync for BufferedArenaResource<'b, R> {}

impl<'b, R: MemoryResource> BufferedArenaResource<'b, R> {
    /// Create an arena over a caller-supplied buffer.
    pub fn new(buffer: &'b mut [u8], fallback: R) -> Self {
        let capacity = buffer.len();
        Self {
            base: NonNull::from(buffer).cast(),
            capacity,
            head: Mutex::new(0),
            owned: None,
            fallbacks: EventCounter::new(),
            fallback,
            _buffer: PhantomData,
        }
    }

    /// Create an arena that owns a heap buffer of `config.arena_capacity` bytes.
    pub fn with_capacity(config: &ResourceConfig, fallback: R) -> Result<Self> {
        let layout = Layout::from_size_align(config.arena_capacity, config.arena_alignment)
            .map_err(|_| AllocError::CapacityOverflow)?;
        let layout = storage_layout(layout);

        // SAFETY: storage_layout never yields a zero size.
        let ptr = unsafe { alloc(layout) };
        let base = NonNull::new(ptr).ok_or_else(|| AllocError::out_of_memory(layout))?;

        Ok(Self {
            base,
            capacity: config.arena_capacity,
            head: Mutex::new(0),
            owned: Some(layout),
            fallbacks: EventCounter::new(),
            fallback,
            _buffer: PhantomData,
        })
    }

    /// The fallback resource.
    pub fn fallback(&self) -> &R {
        &self.fallback
    }

    /// Get total buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get bytes consumed from the buffer, padding included.
    pub fn used(&self) -> usize {
        *self.head.lock()
    }

    /// Get remaining buffer capacity.
    pub fn remaining(&self) -> usize {
        self.capacity - self.used()
    }

    /// Number of allocations served by the fallback.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.get()
    }

    /// Whether `ptr` points into the arena buffer.
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let start = self.base.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        addr >= start && addr < start + self.capacity
    }

    /// Rewind the buffer so it can be reused.
    ///
    /// Requires exclusive access, so nothing allocated from the buffer can
    /// still be borrowed through this arena. Fallback storage is unaffected.
    pub fn release(&mut self) {
        *self.head.get_mut() = 0;
    }

    /// Carve `layout` from the buffer, or `None` if it does not fit.
    fn bump(&self, layout: Layout) -> Option<NonNull<u8>> {
        let layout = storage_layout(layout);
        let mut head = self.head.lock();

        let start = *head + padding_at(self.base.as_ptr(), *head, layout.align());
        let end = start.checked_add(layout.size())?;
        if end > self.capacity {
            return None;
        }
        *head = end;

        // SAFETY: start < end <= capacity, inside the buffer.
        Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(start)) })
    }
}

// SAFETY: buffer storage is disjoint per allocation and outlives the
// arena's users by 'b; all other storage comes from and returns to
// `fallback`. Equality defers to the fallback, and `deallocate` forwards
// any pointer outside the buffer there.
unsafe impl<'b, R: MemoryResource> MemoryResource for BufferedArenaResource<'b, R> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        if let Some(ptr) = self.bump(layout) {
            return Ok(ptr);
        }

        if self.fallbacks.bump() == 0 {
            diagnostics::emit_with_context(
                &PM001,
                format_args!(
                    "request of {}, {} remaining",
                    ByteSize(layout.size()),
                    ByteSize(self.remaining())
                ),
            );
        }
        self.fallback.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if !self.owns(ptr) {
            self.fallback.deallocate(ptr, layout);
        }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        self.fallback.is_equal(other)
    }
}

impl<'b, R> Drop for BufferedArenaResource<'b, R> {
    fn drop(&mut self) {
        if let Some(layout) = self.owned {
            // SAFETY: allocated in `with_capacity` with this layout.
            unsafe { dealloc(self.base.as_ptr(), layout) };
        }
    }
}

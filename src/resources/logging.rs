//! Logging decorator.

use std::alloc::Layout;
use std::collections::VecDeque;
use std::ptr::NonNull;

use crate::api::config::{ResourceConfig, DEFAULT_JOURNAL_CAPACITY};
use crate::error::Result;
use crate::resources::MemoryResource;
use crate::sync::atomics::EventCounter;
use crate::sync::mutex::Mutex;

/// One allocation observed by a [`LoggingResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationEvent {
    /// Position in the order allocations reached the decorator, from 0.
    pub sequence: u64,
    /// Requested size in bytes.
    pub size: usize,
    /// Requested alignment.
    pub align: usize,
}

/// Wraps a resource and reports every allocation.
///
/// Each `allocate` call emits exactly one `log` record and, when the
/// journal is enabled, one [`AllocationEvent`], before delegating.
/// Deallocation and equality are forwarded untouched.
///
/// The journal keeps only the most recent `journal_capacity` events, so a
/// long-lived decorator (for example one installed as the default
/// resource) stays bounded. Sequence numbers keep counting past dropped
/// entries.
///
/// # Example
///
/// ```rust
/// use pmralloc::{new_delete_resource, AllocatorHandle, LoggingResource, Record};
///
/// let logging = LoggingResource::new(new_delete_resource());
/// let record = Record::with_values(7, &[1, 2, 3], AllocatorHandle::new(&logging)).unwrap();
///
/// assert_eq!(logging.allocation_count(), 1);
/// assert_eq!(logging.events()[0].size, 12);
/// # drop(record);
/// ```
pub struct LoggingResource<R> {
    inner: R,
    level: log::Level,
    record_events: bool,
    journal_capacity: usize,
    sequence: EventCounter,
    journal: Mutex<VecDeque<AllocationEvent>>,
}

impl<R: MemoryResource> LoggingResource<R> {
    /// Wrap `inner`, logging at `Info` and keeping a bounded journal.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            level: log::Level::Info,
            record_events: true,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            sequence: EventCounter::new(),
            journal: Mutex::new(VecDeque::new()),
        }
    }

    /// Wrap `inner` with explicit settings.
    pub fn with_config(inner: R, config: &ResourceConfig) -> Self {
        Self {
            inner,
            level: config.log_level,
            record_events: config.record_events,
            journal_capacity: config.journal_capacity,
            sequence: EventCounter::new(),
            journal: Mutex::new(VecDeque::new()),
        }
    }

    /// The wrapped resource.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Number of allocate calls that reached this decorator.
    pub fn allocation_count(&self) -> u64 {
        self.sequence.get()
    }

    /// Snapshot of the journal, oldest first.
    pub fn events(&self) -> Vec<AllocationEvent> {
        self.journal.lock().iter().copied().collect()
    }

    /// Forget recorded events and restart the sequence.
    pub fn clear_events(&self) {
        let mut journal = self.journal.lock();
        journal.clear();
        self.sequence.reset();
    }
}

// SAFETY: every operation is delegated to `inner`.
unsafe impl<R: MemoryResource> MemoryResource for LoggingResource<R> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        // The journal lock orders sequence numbers with journal entries.
        {
            let mut journal = self.journal.lock();
            let sequence = self.sequence.bump();
            log::log!(target: "pmralloc::resource", self.level, "allocating {} bytes", layout.size());
            if self.record_events && self.journal_capacity > 0 {
                if journal.len() == self.journal_capacity {
                    journal.pop_front();
                }
                journal.push_back(AllocationEvent {
                    sequence,
                    size: layout.size(),
                    align: layout.align(),
                });
            }
        }
        self.inner.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout)
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        self.inner.is_equal(other)
    }
}

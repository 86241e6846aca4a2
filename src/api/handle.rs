//! Allocator handles - copyable references to a memory resource.

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use crate::core::emplace;
use crate::core::global::get_default_resource;
use crate::error::Result;
use crate::resources::{same_resource, MemoryResource};

/// A small, copyable, non-owning reference to a [`MemoryResource`].
///
/// The lifetime ties the handle (and everything allocated through it) to
/// the resource. [`Default`] binds to whatever the default-resource slot
/// holds at that moment.
///
/// Two handles compare equal when they refer to the same resource, or when
/// each resource reports the other as equal. Equal handles can free each
/// other's storage, which is what lets values steal storage on a move.
///
/// Implements [`allocator_api2::alloc::Allocator`], so
/// `allocator_api2::vec::Vec<T, AllocatorHandle<'r>>` draws from the
/// resource.
#[derive(Clone, Copy)]
pub struct AllocatorHandle<'r> {
    resource: &'r dyn MemoryResource,
}

impl<'r> AllocatorHandle<'r> {
    /// Create a handle referring to `resource`.
    #[inline]
    pub fn new(resource: &'r dyn MemoryResource) -> Self {
        Self { resource }
    }

    /// The referenced resource.
    #[inline]
    pub fn resource(&self) -> &'r dyn MemoryResource {
        self.resource
    }

    /// Raw storage for `layout`.
    #[inline]
    pub fn allocate_bytes(&self, layout: Layout) -> Result<NonNull<u8>> {
        self.resource.allocate(layout)
    }

    /// Release raw storage.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate_bytes` on an equal handle with the
    /// same `layout`.
    #[inline]
    pub unsafe fn deallocate_bytes(&self, ptr: NonNull<u8>, layout: Layout) {
        self.resource.deallocate(ptr, layout)
    }

    /// Uninitialized storage for one `T`.
    pub fn allocate_object<T>(&self) -> Result<NonNull<T>> {
        self.allocate_bytes(Layout::new::<T>()).map(NonNull::cast)
    }

    /// Release storage for one `T` without dropping it.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate_object::<T>` on an equal handle.
    pub unsafe fn deallocate_object<T>(&self, ptr: NonNull<T>) {
        self.deallocate_bytes(ptr.cast(), Layout::new::<T>())
    }

    /// Allocate and initialize a `T`.
    pub fn new_object<T>(&self, value: T) -> Result<NonNull<T>> {
        emplace::try_emplace(*self, |_| Ok(value))
    }

    /// Allocate a `T` and build it in place with a fallible initializer.
    ///
    /// The initializer receives this handle. On failure the storage is
    /// released before the error propagates.
    pub fn new_object_with<T, F>(&self, init: F) -> Result<NonNull<T>>
    where
        F: FnOnce(AllocatorHandle<'r>) -> Result<T>,
    {
        emplace::try_emplace(*self, init)
    }

    /// Drop and release an object made by `new_object`/`new_object_with`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from an equal handle, hold a live `T`, and not be
    /// used afterwards.
    pub unsafe fn delete_object<T>(&self, ptr: NonNull<T>) {
        emplace::destroy_in(ptr, *self)
    }
}

impl Default for AllocatorHandle<'_> {
    /// Bind to the current default resource.
    fn default() -> Self {
        Self::new(get_default_resource())
    }
}

impl<'r, R: MemoryResource> From<&'r R> for AllocatorHandle<'r> {
    fn from(resource: &'r R) -> Self {
        Self::new(resource)
    }
}

impl PartialEq for AllocatorHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        same_resource(self.resource, other.resource)
            || (self.resource.is_equal(other.resource) && other.resource.is_equal(self.resource))
    }
}

impl Eq for AllocatorHandle<'_> {}

impl fmt::Debug for AllocatorHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatorHandle")
            .field("resource", &(self.resource as *const dyn MemoryResource as *const ()))
            .finish()
    }
}

// SAFETY: storage comes from the referenced resource, which outlives 'r,
// and equal handles (clones included) can release each other's storage.
unsafe impl allocator_api2::alloc::Allocator for AllocatorHandle<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, allocator_api2::alloc::AllocError> {
        self.resource
            .allocate(layout)
            .map(|ptr| NonNull::slice_from_raw_parts(ptr, layout.size()))
            .map_err(|_| allocator_api2::alloc::AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.resource.deallocate(ptr, layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::global::{DefaultResourceGuard, SLOT_TEST_LOCK};
    use crate::resources::{BufferedArenaResource, CountingResource, LoggingResource, NewDeleteResource};
    use allocator_api2::vec::Vec;

    #[test]
    fn test_equality_by_identity() {
        let a = NewDeleteResource::new();
        let b = NewDeleteResource::new();

        assert_eq!(AllocatorHandle::new(&a), AllocatorHandle::new(&a));
        assert_ne!(AllocatorHandle::new(&a), AllocatorHandle::new(&b));
    }

    #[test]
    fn test_one_sided_equality_is_not_enough() {
        let heap = NewDeleteResource::new();
        let logging = LoggingResource::new(&heap);
        let mut buffer = [0u8; 32];
        let arena = BufferedArenaResource::new(&mut buffer, &heap);

        // Both decorators say heap storage is fine for them, but the heap
        // cannot free arena storage, so handles stay unequal.
        assert_ne!(AllocatorHandle::new(&arena), AllocatorHandle::new(&heap));
        assert_ne!(AllocatorHandle::new(&logging), AllocatorHandle::new(&heap));
    }

    #[test]
    fn test_default_reads_slot_at_construction() {
        static ALTERNATE: NewDeleteResource = NewDeleteResource::new();
        let _lock = SLOT_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let before = AllocatorHandle::default();
        let during = {
            let _guard = DefaultResourceGuard::install(&ALTERNATE);
            AllocatorHandle::default()
        };

        assert_eq!(during, AllocatorHandle::new(&ALTERNATE));
        assert_ne!(before, during);
        assert_eq!(before, AllocatorHandle::default());
    }

    #[test]
    fn test_object_helpers() {
        let counting = CountingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::from(&counting);

        let ptr = alloc.new_object(String::from("sub-object")).unwrap();
        assert_eq!(unsafe { ptr.as_ref() }, "sub-object");

        unsafe { alloc.delete_object(ptr) };
        assert!(counting.stats().is_balanced());

        let raw = alloc.allocate_object::<[u16; 3]>().unwrap();
        assert_eq!(counting.stats().bytes_outstanding, 6);
        unsafe { alloc.deallocate_object(raw) };
        assert!(counting.stats().is_balanced());
    }

    #[test]
    fn test_backs_allocator_api2_vec() {
        let counting = CountingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::new(&counting);

        let mut ints: Vec<i32, AllocatorHandle<'_>> = Vec::new_in(alloc);
        ints.push(33);
        ints.push(34);
        assert_eq!(*ints.allocator(), alloc);
        assert!(counting.stats().allocation_count >= 1);

        drop(ints);
        assert!(counting.stats().is_balanced());
    }
}

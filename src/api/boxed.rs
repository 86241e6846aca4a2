//! Owning pointer whose release action is a captured deleter.
//!
//! `AllocBox` is the Rust shape of "unique pointer + allocator deleter":
//! the box owns exactly one object, and its deleter knows which resource
//! the object came from.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::api::handle::AllocatorHandle;
use crate::core::emplace;
use crate::error::Result;

/// Destroys and releases an object owned by an [`AllocBox`].
pub trait Deleter<T> {
    /// Drop `*ptr` and release its storage.
    ///
    /// # Safety
    ///
    /// `ptr` must be live, owned by the caller, and must have been
    /// allocated in the way this deleter expects. It is invalid afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Deleter that captured the handle the object was allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleDeleter<'r> {
    alloc: AllocatorHandle<'r>,
}

impl<'r> HandleDeleter<'r> {
    /// Capture `alloc`.
    pub fn new(alloc: AllocatorHandle<'r>) -> Self {
        Self { alloc }
    }

    /// The captured handle.
    pub fn allocator(&self) -> AllocatorHandle<'r> {
        self.alloc
    }
}

impl<'r, T> Deleter<T> for HandleDeleter<'r> {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        emplace::destroy_in(ptr, self.alloc)
    }
}

/// A Box-like owner for one object and its deleter.
///
/// Dropping the box runs the deleter exactly once. [`AllocBox::into_raw`]
/// hands the pointer and deleter to the caller without running it.
///
/// # Example
///
/// ```rust
/// use pmralloc::{AllocBox, AllocatorHandle, CountingResource, NewDeleteResource};
///
/// let counting = CountingResource::new(NewDeleteResource::new());
/// let alloc = AllocatorHandle::new(&counting);
///
/// {
///     let boxed = AllocBox::new_in(42u64, alloc).unwrap();
///     assert_eq!(*boxed, 42);
///     assert_eq!(counting.outstanding(), 1);
/// } // destroyed and released here
///
/// assert_eq!(counting.outstanding(), 0);
/// ```
pub struct AllocBox<T, D: Deleter<T>> {
    ptr: NonNull<T>,
    deleter: D,
    _owns: PhantomData<T>,
}

impl<'r, T> AllocBox<T, HandleDeleter<'r>> {
    /// Allocate `value` from `alloc`.
    pub fn new_in(value: T, alloc: AllocatorHandle<'r>) -> Result<Self> {
        Self::try_new_with(alloc, |_| Ok(value))
    }

    /// Allocate storage from `alloc`, then build the object with `init`.
    ///
    /// If `init` fails, the storage is released and the error returned.
    pub fn try_new_with<F>(alloc: AllocatorHandle<'r>, init: F) -> Result<Self>
    where
        F: FnOnce(AllocatorHandle<'r>) -> Result<T>,
    {
        let ptr = emplace::try_emplace(alloc, init)?;
        // SAFETY: freshly emplaced from `alloc`, which the deleter captures.
        Ok(unsafe { Self::from_raw(ptr, HandleDeleter::new(alloc)) })
    }

    /// The handle captured by the deleter.
    pub fn allocator(&self) -> AllocatorHandle<'r> {
        self.deleter.allocator()
    }
}

impl<T, D: Deleter<T>> AllocBox<T, D> {
    /// Take ownership of `ptr`, to be released by `deleter`.
    ///
    /// # Safety
    ///
    /// `ptr` must be live, exclusively owned, and releasable by `deleter`.
    pub unsafe fn from_raw(ptr: NonNull<T>, deleter: D) -> Self {
        Self {
            ptr,
            deleter,
            _owns: PhantomData,
        }
    }

    /// Give up ownership without destroying the object.
    ///
    /// The caller becomes responsible for running the deleter.
    pub fn into_raw(self) -> (NonNull<T>, D) {
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the deleter is moved out once.
        let deleter = unsafe { std::ptr::read(&this.deleter) };
        (this.ptr, deleter)
    }

    /// Get the raw pointer.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// The deleter.
    pub fn deleter(&self) -> &D {
        &self.deleter
    }
}

impl<T, D: Deleter<T>> Deref for AllocBox<T, D> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the box owns a live object.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, D: Deleter<T>> DerefMut for AllocBox<T, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the box owns a live object exclusively.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, D: Deleter<T>> Drop for AllocBox<T, D> {
    fn drop(&mut self) {
        // SAFETY: the box still owns the object; this runs once.
        unsafe { self.deleter.delete(self.ptr) }
    }
}

impl<T: fmt::Debug, D: Deleter<T>> fmt::Debug for AllocBox<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// Safety: AllocBox owns its object like Box does
unsafe impl<T: Send, D: Deleter<T> + Send> Send for AllocBox<T, D> {}
unsafe impl<T: Sync, D: Deleter<T> + Sync> Sync for AllocBox<T, D> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AllocError;
    use crate::resources::{CountingResource, NewDeleteResource};
    use std::cell::Cell;
    use std::rc::Rc;

    struct DropFlag(Rc<Cell<u32>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_destroyed_once() {
        let counting = CountingResource::new(NewDeleteResource::new());
        let drops = Rc::new(Cell::new(0));

        let boxed = AllocBox::new_in(DropFlag(drops.clone()), AllocatorHandle::new(&counting)).unwrap();
        drop(boxed);

        assert_eq!(drops.get(), 1);
        assert!(counting.stats().is_balanced());
    }

    #[test]
    fn test_into_raw_suppresses_deleter() {
        let counting = CountingResource::new(NewDeleteResource::new());
        let drops = Rc::new(Cell::new(0));

        let boxed = AllocBox::new_in(DropFlag(drops.clone()), AllocatorHandle::new(&counting)).unwrap();
        let (ptr, deleter) = boxed.into_raw();
        assert_eq!(drops.get(), 0);
        assert_eq!(counting.outstanding(), 1);

        // New owner performs the release.
        let adopted = unsafe { AllocBox::from_raw(ptr, deleter) };
        drop(adopted);
        assert_eq!(drops.get(), 1);
        assert!(counting.stats().is_balanced());
    }

    #[test]
    fn test_failed_init_leaves_nothing() {
        let counting = CountingResource::new(NewDeleteResource::new());

        let result = AllocBox::<u32, _>::try_new_with(AllocatorHandle::new(&counting), |_| {
            Err(AllocError::construction("u32", "injected"))
        });

        assert!(result.is_err());
        assert_eq!(counting.stats().allocation_count, 1);
        assert!(counting.stats().is_balanced());
    }

    #[test]
    fn test_deleter_costs_a_handle() {
        // Captured-deleter form stores the handle next to the pointer.
        assert_eq!(
            std::mem::size_of::<AllocBox<u64, HandleDeleter<'static>>>(),
            std::mem::size_of::<NonNull<u64>>() + std::mem::size_of::<AllocatorHandle<'static>>()
        );
    }
}

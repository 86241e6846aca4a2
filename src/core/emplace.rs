//! Allocate-then-construct helpers.
//!
//! Every sub-object a value owns directly is built as: obtain raw storage,
//! run the initializer, and hand the storage back if the initializer fails
//! (or panics). Nothing is left allocated by a failed construction.

use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::api::handle::AllocatorHandle;
use crate::diagnostics::{self, PM003};
use crate::error::Result;

/// Raw storage for one `T` that is returned to its resource unless filled.
pub struct UninitSlot<'r, T> {
    ptr: NonNull<T>,
    alloc: AllocatorHandle<'r>,
    _marker: PhantomData<T>,
}

impl<'r, T> UninitSlot<'r, T> {
    /// Obtain storage for a `T` from `alloc`.
    pub fn new(alloc: AllocatorHandle<'r>) -> Result<Self> {
        let ptr = alloc.allocate_bytes(Layout::new::<T>())?.cast();
        Ok(Self {
            ptr,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Address of the (uninitialized) storage.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Initialize the storage, giving up the guard.
    pub fn write(self, value: T) -> NonNull<T> {
        let ptr = self.ptr;
        std::mem::forget(self);
        // SAFETY: storage is sized and aligned for T and not yet initialized.
        unsafe { ptr.as_ptr().write(value) };
        ptr
    }
}

impl<'r, T> Drop for UninitSlot<'r, T> {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this layout and never initialized.
        unsafe { self.alloc.deallocate_bytes(self.ptr.cast(), Layout::new::<T>()) };
    }
}

/// Allocate a `T` from `alloc` and initialize it with `init`.
///
/// `init` receives the same handle so the object can allocate its own
/// members from the same resource. If it fails, the storage is released
/// before the error is returned.
pub fn try_emplace<'r, T, F>(alloc: AllocatorHandle<'r>, init: F) -> Result<NonNull<T>>
where
    F: FnOnce(AllocatorHandle<'r>) -> Result<T>,
{
    let slot = UninitSlot::<T>::new(alloc)?;
    match init(alloc) {
        Ok(value) => Ok(slot.write(value)),
        Err(err) => {
            drop(slot);
            diagnostics::emit_with_context(&PM003, format_args!("{}", err));
            Err(err)
        }
    }
}

/// Drop the object at `ptr` and release its storage.
///
/// # Safety
///
/// `ptr` must come from [`try_emplace`] (or an equal allocation) on a
/// resource equal to `alloc`'s, hold an initialized `T`, and not be used
/// afterwards.
pub unsafe fn destroy_in<T>(ptr: NonNull<T>, alloc: AllocatorHandle<'_>) {
    std::ptr::drop_in_place(ptr.as_ptr());
    alloc.deallocate_bytes(ptr.cast(), Layout::new::<T>());
}

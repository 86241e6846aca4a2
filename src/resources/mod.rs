//! Memory resources - pluggable sources of raw storage.
//!
//! A [`MemoryResource`] is the capability every allocator-aware value in
//! this crate ultimately draws from. Resources are identity-bearing: they
//! are never copied, only referenced, and two distinct resources are not
//! interchangeable unless they explicitly say so through
//! [`MemoryResource::is_equal`].
//!
//! Provided implementations:
//!
//! | Resource                  | Behavior                                        |
//! |---------------------------|-------------------------------------------------|
//! | [`NewDeleteResource`]     | Global heap (`std::alloc`)                      |
//! | [`LoggingResource`]       | Logs each allocation, forwards everything       |
//! | [`BufferedArenaResource`] | Bump-allocates from a buffer, then falls back   |
//! | [`CountingResource`]      | Tracks outstanding storage, optional limit      |

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::error::Result;

pub mod arena;
pub mod counting;
pub mod heap;
pub mod logging;

pub use arena::BufferedArenaResource;
pub use counting::CountingResource;
pub use heap::{new_delete_resource, NewDeleteResource};
pub use logging::{AllocationEvent, LoggingResource};

/// An abstract source of raw storage.
///
/// # Safety
///
/// Implementors must uphold:
///
/// - `allocate` returns storage valid for `layout.size()` bytes (at least
///   one byte) aligned to `layout.align()`, which stays valid until it is
///   passed back to `deallocate`.
/// - `is_equal(other)` returns `true` only if storage allocated by `other`
///   may be released through `self.deallocate`. Values steal storage
///   between handles that compare equal, so a false positive here frees
///   memory through the wrong resource.
pub unsafe trait MemoryResource: Send + Sync {
    /// Obtain storage for `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// Release storage.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this resource (or one it reports
    /// equal to) with the same `layout`, and must not be released twice.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether storage from `other` can be released through `self`.
    ///
    /// Identity by default.
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        std::ptr::addr_eq(self as *const Self, other as *const dyn MemoryResource)
    }
}

/// Address identity of two resources.
#[inline]
pub fn same_resource(a: &dyn MemoryResource, b: &dyn MemoryResource) -> bool {
    std::ptr::addr_eq(a as *const dyn MemoryResource, b as *const dyn MemoryResource)
}

// SAFETY: forwards to the referenced resource, whose guarantees carry over.
unsafe impl<R: MemoryResource + ?Sized> MemoryResource for &R {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }

    #[inline]
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        (**self).is_equal(other)
    }
}

//! A growable array of allocator-aware elements.
//!
//! Every element lives in the vector's own resource: insertion goes
//! through the element's extended constructors with the vector's handle.
//!
//! Growth allocates the new buffer, builds the inserted element in it, and
//! only then relocates the existing elements. How they are relocated is the
//! [`RelocationPolicy`]:
//!
//! - `PreferInfallibleMove` (default) relocates with a plain Rust move.
//!   It cannot fail, so a failed push never touches existing elements.
//! - `ExtendedMove` relocates each element through
//!   [`AllocatorAware::move_in`]. That move can fail, and a failure part way
//!   leaves the elements relocated so far in their moved-from state even
//!   though the push reports an error. No element is leaked or dropped
//!   twice either way.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use crate::api::aware::AllocatorAware;
use crate::api::handle::AllocatorHandle;
use crate::diagnostics::{self, PM102};
use crate::error::{AllocError, Result};

/// How existing elements are carried into a reallocated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelocationPolicy {
    /// Bitwise move; never allocates, never fails.
    #[default]
    PreferInfallibleMove,
    /// Extended move into the vector's handle; may allocate and fail.
    ExtendedMove,
}

/// A vector whose elements share its allocator.
///
/// Capacity grows 0, 1, 2, 4, ... so the third insertion into a fresh
/// vector reallocates.
///
/// # Example
///
/// ```rust
/// use pmralloc::{AllocatorHandle, AwareVec, NewDeleteResource, Record};
///
/// let heap = NewDeleteResource::new();
/// let alloc = AllocatorHandle::new(&heap);
///
/// let mut records = AwareVec::new_in(alloc);
/// records.push(Record::with_values(1, &[10, 20], alloc).unwrap()).unwrap();
/// records.emplace_with(|alloc| Record::with_id(2, alloc)).unwrap();
///
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].values(), &[10, 20]);
/// ```
pub struct AwareVec<'r, T> {
    ptr: NonNull<T>,
    len: usize,
    capacity: usize,
    alloc: AllocatorHandle<'r>,
    policy: RelocationPolicy,
    _owns: PhantomData<T>,
}

impl<'r, T: AllocatorAware<'r>> AwareVec<'r, T> {
    /// Create an empty vector in `alloc`. Does not allocate.
    pub fn new_in(alloc: AllocatorHandle<'r>) -> Self {
        Self::with_policy(alloc, RelocationPolicy::default())
    }

    /// Create an empty vector with an explicit relocation policy.
    pub fn with_policy(alloc: AllocatorHandle<'r>, policy: RelocationPolicy) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: 0,
            alloc,
            policy,
            _owns: PhantomData,
        }
    }

    /// Current relocation policy.
    pub fn policy(&self) -> RelocationPolicy {
        self.policy
    }

    /// Change the relocation policy for future growth.
    pub fn set_policy(&mut self, policy: RelocationPolicy) {
        self.policy = policy;
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements the current buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert an owned value.
    ///
    /// A value already in this vector's resource is moved in bitwise.
    /// Otherwise it is copied into the vector's resource and the original
    /// dropped.
    pub fn push(&mut self, value: T) -> Result<()> {
        self.emplace_with(|_| Ok(value))
    }

    /// Insert by extended move from `source`.
    ///
    /// `source` is left moved-from if its allocator equals the vector's,
    /// and untouched otherwise or on failure. The exception is a failed
    /// push under [`RelocationPolicy::ExtendedMove`] with a matching
    /// allocator: `source`'s storage was already taken into the new
    /// buffer, and is destroyed with it when a later relocation fails.
    pub fn push_from(&mut self, source: &mut T) -> Result<()> {
        self.emplace_with(|alloc| T::move_in(source, alloc))
    }

    /// Insert a copy of `source` made in the vector's resource.
    pub fn push_clone(&mut self, source: &T) -> Result<()> {
        self.emplace_with(|alloc| source.clone_in(alloc))
    }

    /// Build a new element in place from the vector's handle.
    ///
    /// A value that `init` built in some other resource is moved into the
    /// vector's resource before it is stored. On failure the vector is
    /// unchanged (see [`RelocationPolicy`] for the state of existing
    /// elements under `ExtendedMove`).
    pub fn emplace_with<F>(&mut self, init: F) -> Result<()>
    where
        F: FnOnce(AllocatorHandle<'r>) -> Result<T>,
    {
        let init = move |alloc: AllocatorHandle<'r>| adopt(init(alloc)?, alloc);

        if self.len < self.capacity {
            let value = init(self.alloc)?;
            // SAFETY: len < capacity, slot is uninitialized.
            unsafe { self.ptr.as_ptr().add(self.len).write(value) };
            self.len += 1;
            return Ok(());
        }

        let new_capacity = if self.capacity == 0 {
            1
        } else {
            self.capacity.checked_mul(2).ok_or(AllocError::CapacityOverflow)?
        };
        self.reallocate(new_capacity, Some(init))
    }

    /// Make room for at least `additional` more elements.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let required = self.len.checked_add(additional).ok_or(AllocError::CapacityOverflow)?;
        if required <= self.capacity {
            return Ok(());
        }
        self.reallocate(required, None::<fn(AllocatorHandle<'r>) -> Result<T>>)
    }

    /// Remove the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.len -= 1;
        // SAFETY: index len was initialized and is now outside the live range.
        unsafe { Some(self.ptr.as_ptr().add(self.len).read()) }
    }

    /// Drop all elements, keeping the buffer.
    pub fn clear(&mut self) {
        let len = self.len;
        // Shrink first so a panicking destructor cannot cause a double drop.
        self.len = 0;
        // SAFETY: the first `len` slots were initialized.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), len)) };
    }

    fn buffer_layout(capacity: usize) -> Result<Layout> {
        Layout::array::<T>(capacity).map_err(|_| AllocError::CapacityOverflow)
    }

    /// Move everything into a buffer of `new_capacity`, optionally
    /// building one extra element at index `len` first.
    fn reallocate<F>(&mut self, new_capacity: usize, insert: Option<F>) -> Result<()>
    where
        F: FnOnce(AllocatorHandle<'r>) -> Result<T>,
    {
        let layout = Self::buffer_layout(new_capacity)?;
        let buffer = self.alloc.allocate_bytes(layout)?.cast::<T>();
        let mut staging = Staging {
            buffer,
            layout,
            alloc: self.alloc,
            relocated: 0,
            inserted: None,
        };

        let inserting = insert.is_some();
        if let Some(init) = insert {
            let value = init(self.alloc)?;
            // SAFETY: len < new_capacity, slot is uninitialized.
            unsafe { buffer.as_ptr().add(self.len).write(value) };
            staging.inserted = Some(self.len);
        }

        match self.policy {
            RelocationPolicy::PreferInfallibleMove => {
                // SAFETY: both buffers hold at least `len` slots and do not
                // overlap; the old slots become logically uninitialized.
                unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), buffer.as_ptr(), self.len) };
            }
            RelocationPolicy::ExtendedMove => {
                if self.len > 0 {
                    diagnostics::emit_with_context(&PM102, format_args!("relocating {} elements", self.len));
                }
                for index in 0..self.len {
                    // SAFETY: index < len, old slot is initialized.
                    let source = unsafe { &mut *self.ptr.as_ptr().add(index) };
                    let moved = T::move_in(source, self.alloc)?;
                    // SAFETY: index < new_capacity, new slot is uninitialized.
                    unsafe { buffer.as_ptr().add(index).write(moved) };
                    staging.relocated += 1;
                }
            }
        }

        staging.commit();

        let old_ptr = std::mem::replace(&mut self.ptr, buffer);
        let old_capacity = std::mem::replace(&mut self.capacity, new_capacity);
        let old_len = self.len;
        if inserting {
            self.len += 1;
        }

        if self.policy == RelocationPolicy::ExtendedMove {
            // Moved-from originals are still live values.
            // SAFETY: the first `old_len` old slots are initialized.
            unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(old_ptr.as_ptr(), old_len)) };
        }
        if old_capacity > 0 {
            if let Ok(old_layout) = Self::buffer_layout(old_capacity) {
                // SAFETY: the old buffer came from `alloc` with this layout.
                unsafe { self.alloc.deallocate_bytes(old_ptr.cast(), old_layout) };
            }
        }
        Ok(())
    }
}

/// `value` itself if it lives in `alloc`'s resource, else its extended move there.
fn adopt<'r, T: AllocatorAware<'r>>(mut value: T, alloc: AllocatorHandle<'r>) -> Result<T> {
    if value.allocator() == alloc {
        Ok(value)
    } else {
        T::move_in(&mut value, alloc)
    }
}

/// A half-built replacement buffer, torn down unless committed.
struct Staging<'r, T> {
    buffer: NonNull<T>,
    layout: Layout,
    alloc: AllocatorHandle<'r>,
    /// Prefix of slots filled by relocation
    relocated: usize,
    /// Slot holding the inserted element
    inserted: Option<usize>,
}

impl<T> Staging<'_, T> {
    fn commit(self) {
        std::mem::forget(self);
    }
}

impl<T> Drop for Staging<'_, T> {
    fn drop(&mut self) {
        // SAFETY: exactly these slots were initialized, and the buffer came
        // from `alloc` with `layout`.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.buffer.as_ptr(), self.relocated));
            if let Some(index) = self.inserted {
                ptr::drop_in_place(self.buffer.as_ptr().add(index));
            }
            self.alloc.deallocate_bytes(self.buffer.cast(), self.layout);
        }
    }
}

impl<'r, T> Deref for AwareVec<'r, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<'r, T> DerefMut for AwareVec<'r, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: the first `len` slots are initialized and exclusively borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<'r, T> Drop for AwareVec<'r, T> {
    fn drop(&mut self) {
        // SAFETY: the first `len` slots are initialized.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len)) };
        if self.capacity > 0 {
            if let Ok(layout) = Layout::array::<T>(self.capacity) {
                // SAFETY: the buffer came from `alloc` with this layout.
                unsafe { self.alloc.deallocate_bytes(self.ptr.cast(), layout) };
            }
        }
    }
}

impl<'r, T: fmt::Debug> fmt::Debug for AwareVec<'r, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// SAFETY: AwareVec owns its elements like Vec does, and handles are Send + Sync.
unsafe impl<'r, T: Send> Send for AwareVec<'r, T> {}
unsafe impl<'r, T: Sync> Sync for AwareVec<'r, T> {}

/// The vector is itself allocator-aware: copies put every element in the
/// target resource.
impl<'r, T: AllocatorAware<'r>> AllocatorAware<'r> for AwareVec<'r, T> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        self.alloc
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok(Self::with_policy(alloc, RelocationPolicy::default()))
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let mut copy = Self::with_policy(alloc, self.policy);
        copy.try_reserve(self.len)?;
        for item in self.iter() {
            copy.push_clone(item)?;
        }
        Ok(copy)
    }

    fn steal(source: &mut Self) -> Self {
        let empty = Self::with_policy(source.alloc, source.policy);
        std::mem::replace(source, empty)
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        self.clear();
        self.try_reserve(other.len)?;
        for item in other.iter() {
            self.push_clone(item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{CountingResource, LoggingResource, NewDeleteResource};
    use crate::values::{FaultPlan, Record, Tracked};

    #[test]
    fn test_growth_doubles() {
        let heap = NewDeleteResource::new();
        let mut tags = AwareVec::new_in(AllocatorHandle::new(&heap));
        let mut seen = Vec::new();

        for tag in 0..5 {
            tags.push(Tracked::new(tag, AllocatorHandle::new(&heap))).unwrap();
            seen.push(tags.capacity());
        }

        assert_eq!(seen, vec![1, 2, 4, 4, 8]);
        assert_eq!(tags.iter().map(|t| t.tag()).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_push_from_other_resource_copies() {
        let home = NewDeleteResource::new();
        let away = NewDeleteResource::new();
        let mut records = AwareVec::new_in(AllocatorHandle::new(&home));
        let mut source = Record::with_values(3, &[1, 2], AllocatorHandle::new(&away)).unwrap();

        records.push_from(&mut source).unwrap();

        assert_eq!(records[0].allocator(), AllocatorHandle::new(&home));
        assert_eq!(source.values(), &[1, 2]);
        assert_eq!(records[0].values(), &[1, 2]);
    }

    #[test]
    fn test_emplace_moves_foreign_value_into_vector_resource() {
        let home = NewDeleteResource::new();
        let away = NewDeleteResource::new();
        let alloc = AllocatorHandle::new(&home);
        let mut records = AwareVec::new_in(alloc);

        // Through reallocation, then into spare capacity.
        records.emplace_with(|_| Record::with_values(1, &[1, 2], AllocatorHandle::new(&away))).unwrap();
        records.try_reserve(4).unwrap();
        records.emplace_with(|_| Record::with_values(2, &[3], AllocatorHandle::new(&away))).unwrap();

        assert!(records.iter().all(|r| r.allocator() == alloc));
        assert_eq!(records[0].values(), &[1, 2]);
        assert_eq!(records[1].values(), &[3]);
        assert_eq!(away.allocated_bytes(), 0);
    }

    #[test]
    fn test_default_policy_relocation_never_allocates_elements() {
        let logging = LoggingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::new(&logging);
        let mut records = AwareVec::new_in(alloc);

        records.push(Record::with_values(1, &[1], alloc).unwrap()).unwrap();
        let before = logging.allocation_count();
        records.push(Record::with_values(2, &[2], alloc).unwrap()).unwrap();

        // One for the record's storage, one for the bigger buffer.
        assert_eq!(logging.allocation_count(), before + 2);
        assert_eq!(records[0].values(), &[1]);
    }

    #[test]
    fn test_failed_insert_leaves_elements_untouched() {
        let heap = NewDeleteResource::new();
        let alloc = AllocatorHandle::new(&heap);
        let plan = FaultPlan::new();
        let mut tags = AwareVec::new_in(alloc);

        let mut first = Tracked::with_plan(1, alloc, &plan);
        let mut second = Tracked::with_plan(2, alloc, &plan);
        tags.push_from(&mut first).unwrap();
        tags.push_from(&mut second).unwrap();

        plan.fail_after(0);
        let mut third = Tracked::with_plan(3, alloc, &plan);
        let err = tags.push_from(&mut third).unwrap_err();

        assert!(matches!(err, AllocError::Construction { .. }));
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.capacity(), 2);
        assert!(tags.iter().all(|t| !t.is_moved_from()));
        assert!(!third.is_moved_from());
    }

    #[test]
    fn test_extended_move_relocation_leaves_moved_from_elements() {
        let heap = NewDeleteResource::new();
        let alloc = AllocatorHandle::new(&heap);
        let plan = FaultPlan::new();
        let mut tags = AwareVec::with_policy(alloc, RelocationPolicy::ExtendedMove);

        tags.push(Tracked::with_plan(1, alloc, &plan)).unwrap();
        tags.push(Tracked::with_plan(2, alloc, &plan)).unwrap();

        // Insert succeeds, first relocation succeeds, second fails.
        plan.fail_after(2);
        let mut third = Tracked::with_plan(3, alloc, &plan);
        assert!(tags.push_from(&mut third).is_err());

        assert_eq!(tags.len(), 2);
        assert!(tags[0].is_moved_from());
        assert!(!tags[1].is_moved_from());
    }

    #[test]
    fn test_failed_growth_releases_buffer() {
        let counting = CountingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::new(&counting);
        let plan = FaultPlan::new();

        {
            let mut tags = AwareVec::new_in(alloc);
            tags.push(Tracked::new(1, alloc)).unwrap();
            plan.fail_after(0);
            let mut doomed = Tracked::with_plan(2, alloc, &plan);
            assert!(tags.push_from(&mut doomed).is_err());
            assert_eq!(counting.outstanding(), 1);
        }

        assert!(counting.stats().is_balanced());
    }

    #[test]
    fn test_clone_in_moves_every_element() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let mut records = AwareVec::new_in(AllocatorHandle::new(&first));
        records.push(Record::with_values(1, &[5, 6], AllocatorHandle::new(&first)).unwrap()).unwrap();

        let copy = records.clone_in(AllocatorHandle::new(&second)).unwrap();

        assert_eq!(copy.allocator(), AllocatorHandle::new(&second));
        assert_eq!(copy[0].allocator(), AllocatorHandle::new(&second));
        assert_eq!(copy[0].values(), &[5, 6]);
    }
}

//! The allocator-aware value protocol.
//!
//! A type implementing [`AllocatorAware`] keeps all of its heap storage in
//! the resource named by [`AllocatorAware::allocator`], and provides the
//! full construction matrix a container needs to place it in its own
//! resource:
//!
//! | Operation              | Method                    | Allocates | Source afterwards    |
//! |------------------------|---------------------------|-----------|----------------------|
//! | default construct      | `new_in`                  | yes       | -                    |
//! | copy / extended copy   | `clone_in`                | yes       | untouched            |
//! | move                   | `steal`                   | never     | moved-from           |
//! | extended move, equal   | `move_in`                 | never     | moved-from           |
//! | extended move, unequal | `move_in`                 | yes       | untouched            |
//! | copy assignment        | `assign`                  | maybe     | untouched            |
//! | move assignment        | `move_assign`             | maybe     | moved-from or intact |
//!
//! A plain Rust move (`let b = a;`) is always the non-throwing move: it is
//! bitwise, never allocates, and keeps the allocator.
//!
//! Rather than an overload set, [`construct`] takes an explicit
//! [`Source`] plus an optional target handle, so the steal-or-copy choice
//! is a visible branch on allocator equality.

use crate::api::handle::AllocatorHandle;
use crate::diagnostics::{self, PM101};
use crate::error::Result;

/// A value whose storage comes from an [`AllocatorHandle`].
///
/// Invariant: once constructed, every heap allocation the value owns
/// (directly or through members) comes from `allocator()`'s resource.
pub trait AllocatorAware<'r>: Sized {
    /// The handle backing this value's storage.
    fn allocator(&self) -> AllocatorHandle<'r>;

    /// Build an empty/default value in `alloc`.
    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self>;

    /// Deep-copy `self` into storage from `alloc`.
    ///
    /// Never touches `self`'s allocator.
    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self>;

    /// Take `source`'s storage and allocator in constant time.
    ///
    /// Never allocates and cannot fail. `source` is left moved-from:
    /// logically empty, still valid, still carrying its allocator.
    fn steal(source: &mut Self) -> Self;

    /// Replace `self`'s value with a copy of `other`'s, using `self`'s
    /// own allocator.
    ///
    /// No strong guarantee: on failure `self` may hold a mix of old and
    /// new state (still valid, still backed by its own resource).
    fn assign(&mut self, other: &Self) -> Result<()>;

    /// Extended move: place `source`'s value in `alloc`.
    ///
    /// Steals when `alloc` equals `source.allocator()`. Otherwise copies
    /// into fresh storage and leaves `source` untouched, since storage
    /// cannot change resource.
    fn move_in(source: &mut Self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        if alloc == source.allocator() {
            Ok(Self::steal(source))
        } else {
            diagnostics::emit(&PM101);
            source.clone_in(alloc)
        }
    }

    /// Move assignment: adopt `other`'s storage when allocators are equal,
    /// otherwise copy into `self`'s resource and leave `other` intact.
    fn move_assign(&mut self, other: &mut Self) -> Result<()> {
        if self.allocator() == other.allocator() {
            *self = Self::steal(other);
            Ok(())
        } else {
            self.assign(other)
        }
    }
}

/// Where a constructed value takes its contents from.
pub enum Source<'s, T> {
    /// Nothing: default construction.
    Empty,
    /// Copy from a borrowed value.
    Borrowed(&'s T),
    /// Move from a value; it may be left moved-from.
    Owned(&'s mut T),
}

/// The single construction entry point.
///
/// | source        | `alloc`   | result                                     |
/// |---------------|-----------|--------------------------------------------|
/// | `Empty`       | `None`    | `new_in(default)`                          |
/// | `Empty`       | `Some(h)` | `new_in(h)`                                |
/// | `Borrowed(o)` | `None`    | `o.clone_in(default)`                      |
/// | `Borrowed(o)` | `Some(h)` | `o.clone_in(h)`                            |
/// | `Owned(o)`    | `None`    | `steal(o)` - infallible, keeps o's handle  |
/// | `Owned(o)`    | `Some(h)` | `move_in(o, h)` - steal if equal, else copy|
///
/// A copy never inherits the source's allocator; it uses the explicit
/// handle or the current default.
pub fn construct<'r, T>(source: Source<'_, T>, alloc: Option<AllocatorHandle<'r>>) -> Result<T>
where
    T: AllocatorAware<'r>,
{
    match (source, alloc) {
        (Source::Empty, alloc) => T::new_in(alloc.unwrap_or_default()),
        (Source::Borrowed(other), alloc) => other.clone_in(alloc.unwrap_or_default()),
        (Source::Owned(other), None) => Ok(T::steal(other)),
        (Source::Owned(other), Some(alloc)) => T::move_in(other, alloc),
    }
}

// =============================================================================
// Protocol implementations for collaborator types
// =============================================================================

/// An `allocator_api2` vector in a handle is allocator-aware; its
/// moved-from state is an empty vector in the same resource.
impl<'r, T: Clone> AllocatorAware<'r> for allocator_api2::vec::Vec<T, AllocatorHandle<'r>> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        *allocator_api2::vec::Vec::allocator(self)
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok(allocator_api2::vec::Vec::new_in(alloc))
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let mut copy = allocator_api2::vec::Vec::new_in(alloc);
        copy.try_reserve_exact(self.len())?;
        copy.extend_from_slice(self);
        Ok(copy)
    }

    fn steal(source: &mut Self) -> Self {
        let alloc = *allocator_api2::vec::Vec::allocator(source);
        std::mem::replace(source, allocator_api2::vec::Vec::new_in(alloc))
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        self.clear();
        self.try_reserve_exact(other.len())?;
        self.extend_from_slice(other);
        Ok(())
    }
}

/// Pairs use the first member's allocator and pass the handle to both
/// members.
impl<'r, A, B> AllocatorAware<'r> for (A, B)
where
    A: AllocatorAware<'r>,
    B: AllocatorAware<'r>,
{
    fn allocator(&self) -> AllocatorHandle<'r> {
        self.0.allocator()
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok((A::new_in(alloc)?, B::new_in(alloc)?))
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok((self.0.clone_in(alloc)?, self.1.clone_in(alloc)?))
    }

    fn steal(source: &mut Self) -> Self {
        (A::steal(&mut source.0), B::steal(&mut source.1))
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        self.0.assign(&other.0)?;
        self.1.assign(&other.1)
    }

    fn move_in(source: &mut Self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        // Decide once for the pair so a failure never leaves one member
        // stolen and the other untouched.
        if alloc == source.0.allocator() && alloc == source.1.allocator() {
            Ok(Self::steal(source))
        } else {
            source.clone_in(alloc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{LoggingResource, NewDeleteResource};
    use allocator_api2::vec::Vec;

    type Ints<'r> = Vec<i32, AllocatorHandle<'r>>;

    fn ints<'r>(values: &[i32], alloc: AllocatorHandle<'r>) -> Ints<'r> {
        let mut v = Vec::new_in(alloc);
        v.extend_from_slice(values);
        v
    }

    #[test]
    fn test_steal_never_allocates() {
        let logging = LoggingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::new(&logging);
        let mut source = ints(&[1, 2, 3], alloc);
        let before = logging.allocation_count();

        let stolen: Ints<'_> = construct(Source::Owned(&mut source), None).unwrap();

        assert_eq!(logging.allocation_count(), before);
        assert_eq!(&stolen[..], &[1, 2, 3]);
        assert!(source.is_empty());
        assert_eq!(AllocatorAware::allocator(&source), alloc);
    }

    #[test]
    fn test_move_in_unequal_copies_and_leaves_source() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let mut source = ints(&[4, 5], AllocatorHandle::new(&first));

        let moved: Ints<'_> = construct(Source::Owned(&mut source), Some(AllocatorHandle::new(&second))).unwrap();

        assert_eq!(&moved[..], &[4, 5]);
        assert_eq!(&source[..], &[4, 5]);
        assert_eq!(AllocatorAware::allocator(&moved), AllocatorHandle::new(&second));
    }

    #[test]
    fn test_copy_uses_target_not_source_allocator() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let source = ints(&[9], AllocatorHandle::new(&first));

        let copy: Ints<'_> = construct(Source::Borrowed(&source), Some(AllocatorHandle::new(&second))).unwrap();

        assert_eq!(AllocatorAware::allocator(&copy), AllocatorHandle::new(&second));
        assert!(first.allocated_bytes() > 0);
        assert_eq!(second.allocated_bytes(), 4);
    }

    #[test]
    fn test_move_assign_copies_across_resources() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let mut target = ints(&[0], AllocatorHandle::new(&first));
        let mut other = ints(&[7, 8], AllocatorHandle::new(&second));

        target.move_assign(&mut other).unwrap();

        assert_eq!(&target[..], &[7, 8]);
        assert_eq!(&other[..], &[7, 8]);
        assert_eq!(AllocatorAware::allocator(&target), AllocatorHandle::new(&first));
    }

    #[test]
    fn test_pair_propagates_to_both_members() {
        let heap = NewDeleteResource::new();
        let alloc = AllocatorHandle::new(&heap);

        let mut pair: (Ints<'_>, Vec<u8, AllocatorHandle<'_>>) = construct(Source::Empty, Some(alloc)).unwrap();
        pair.0.push(1);
        pair.1.push(b'x');

        let other = NewDeleteResource::new();
        let copy = pair.clone_in(AllocatorHandle::new(&other)).unwrap();
        assert_eq!(AllocatorAware::allocator(&copy.1), AllocatorHandle::new(&other));
        assert_eq!(&copy.0[..], &[1]);
    }
}

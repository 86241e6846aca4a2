//! An id plus a vector of integers, all storage in one resource.

use std::fmt;

use allocator_api2::vec::Vec;

use crate::api::aware::AllocatorAware;
use crate::api::handle::AllocatorHandle;
use crate::error::Result;

/// Integer vector backed by a handle.
pub type IntVec<'r> = Vec<i32, AllocatorHandle<'r>>;

/// A record whose only heap storage is its value vector.
///
/// The allocator is not stored separately; it is the vector's.
///
/// # Example
///
/// ```rust
/// use pmralloc::{AllocatorAware, AllocatorHandle, NewDeleteResource, Record};
///
/// let heap = NewDeleteResource::new();
/// let record = Record::with_values(33, &[1, 2, 3], AllocatorHandle::new(&heap)).unwrap();
///
/// assert_eq!(record.id(), 33);
/// assert_eq!(record.values(), &[1, 2, 3]);
/// assert_eq!(record.allocator(), AllocatorHandle::new(&heap));
/// ```
pub struct Record<'r> {
    id: i32,
    values: IntVec<'r>,
    moved_from: bool,
}

impl<'r> Record<'r> {
    /// An empty record with the given id. Does not allocate.
    pub fn with_id(id: i32, alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok(Self {
            id,
            values: Vec::new_in(alloc),
            moved_from: false,
        })
    }

    /// A record holding a copy of `values`, allocated exactly from `alloc`.
    pub fn with_values(id: i32, values: &[i32], alloc: AllocatorHandle<'r>) -> Result<Self> {
        let mut copy = Vec::new_in(alloc);
        copy.try_reserve_exact(values.len())?;
        copy.extend_from_slice(values);
        Ok(Self {
            id,
            values: copy,
            moved_from: false,
        })
    }

    /// A record adopting `values`.
    ///
    /// The vector's storage is taken over when it already lives in
    /// `alloc`'s resource; otherwise it is copied there.
    pub fn from_vec(id: i32, values: IntVec<'r>, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let mut values = values;
        Ok(Self {
            id,
            values: AllocatorAware::move_in(&mut values, alloc)?,
            moved_from: false,
        })
    }

    /// Get the id.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Set the id.
    pub fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    /// Get the values.
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Mutable access to the values.
    pub fn values_mut(&mut self) -> &mut [i32] {
        &mut self.values
    }

    /// Append a value, growing in the record's resource.
    pub fn push_value(&mut self, value: i32) -> Result<()> {
        self.values.try_reserve(1)?;
        self.values.push(value);
        Ok(())
    }

    /// Whether the value storage was stolen.
    ///
    /// Set only by a steal; an empty record that was never moved from
    /// reports false. Cleared by `assign`.
    pub fn is_moved_from(&self) -> bool {
        self.moved_from
    }
}

impl<'r> AllocatorAware<'r> for Record<'r> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        *self.values.allocator()
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        Self::with_id(0, alloc)
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok(Self {
            id: self.id,
            values: self.values.clone_in(alloc)?,
            moved_from: false,
        })
    }

    fn steal(source: &mut Self) -> Self {
        source.moved_from = true;
        Self {
            id: source.id,
            values: AllocatorAware::steal(&mut source.values),
            moved_from: false,
        }
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        self.id = other.id;
        self.values.assign(&other.values)?;
        self.moved_from = false;
        Ok(())
    }
}

impl PartialEq for Record<'_> {
    /// Compares logical value only; the backing resource is not part of it.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.values[..] == other.values[..]
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("values", &&self.values[..])
            .field("allocator", &self.allocator())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{LoggingResource, NewDeleteResource};

    #[test]
    fn test_with_values_allocates_once() {
        let logging = LoggingResource::new(NewDeleteResource::new());
        let record = Record::with_values(1, &[1, 2, 3], AllocatorHandle::new(&logging)).unwrap();

        let events = logging.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].size, 12);
        assert_eq!(record.values(), &[1, 2, 3]);
    }

    #[test]
    fn test_from_vec_steals_in_same_resource() {
        let logging = LoggingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::new(&logging);
        let mut values = Vec::new_in(alloc);
        values.extend_from_slice(&[4, 5]);
        let before = logging.allocation_count();

        let record = Record::from_vec(2, values, alloc).unwrap();

        assert_eq!(logging.allocation_count(), before);
        assert_eq!(record.values(), &[4, 5]);
    }

    #[test]
    fn test_from_vec_copies_across_resources() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let mut values = Vec::new_in(AllocatorHandle::new(&first));
        values.push(6);

        let record = Record::from_vec(3, values, AllocatorHandle::new(&second)).unwrap();

        assert_eq!(record.allocator(), AllocatorHandle::new(&second));
        // The original vector was dropped after the copy.
        assert_eq!(first.allocated_bytes(), 0);
    }

    #[test]
    fn test_steal_keeps_id_and_allocator() {
        let heap = NewDeleteResource::new();
        let alloc = AllocatorHandle::new(&heap);
        let mut source = Record::with_values(9, &[1], alloc).unwrap();

        let stolen = Record::steal(&mut source);

        assert_eq!(stolen.values(), &[1]);
        assert!(source.is_moved_from());
        assert_eq!(source.id(), 9);
        assert_eq!(source.allocator(), alloc);
    }

    #[test]
    fn test_empty_record_is_not_moved_from() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let home = AllocatorHandle::new(&first);

        assert!(!Record::with_id(1, home).unwrap().is_moved_from());
        assert!(!Record::new_in(home).unwrap().is_moved_from());

        let mut source = Record::with_values(2, &[], home).unwrap();
        let copy = Record::move_in(&mut source, AllocatorHandle::new(&second)).unwrap();

        assert!(!source.is_moved_from());
        assert!(!copy.is_moved_from());
        assert_eq!(source.allocator(), home);
        assert_eq!(copy.allocator(), AllocatorHandle::new(&second));
    }

    #[test]
    fn test_assign_clears_moved_from() {
        let heap = NewDeleteResource::new();
        let alloc = AllocatorHandle::new(&heap);
        let mut source = Record::with_values(5, &[3], alloc).unwrap();
        let _stolen = Record::steal(&mut source);
        assert!(source.is_moved_from());

        let other = Record::with_values(6, &[4, 4], alloc).unwrap();
        source.assign(&other).unwrap();

        assert!(!source.is_moved_from());
        assert_eq!(source, other);
    }

    #[test]
    fn test_assign_keeps_receiver_resource() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let mut target = Record::with_id(0, AllocatorHandle::new(&first)).unwrap();
        let other = Record::with_values(4, &[8, 9], AllocatorHandle::new(&second)).unwrap();

        target.assign(&other).unwrap();

        assert_eq!(target, other);
        assert_eq!(target.allocator(), AllocatorHandle::new(&first));
    }
}

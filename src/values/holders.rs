//! Three ways to own a [`Payload`] allocated from a resource.
//!
//! They hold the same logical value and differ only in where the handle
//! needed for teardown lives:
//!
//! - [`CapturedHolder`] keeps its own handle and an [`AllocBox`] whose
//!   deleter captured a second copy. Largest.
//! - [`EmbeddedHolder`] keeps one handle and tears the payload down in its
//!   own `Drop`.
//! - [`DelegatedHolder`] keeps only the pointer and asks the payload for
//!   its allocator. Pointer-sized.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::api::aware::AllocatorAware;
use crate::api::boxed::{AllocBox, HandleDeleter};
use crate::api::handle::AllocatorHandle;
use crate::core::emplace;
use crate::error::Result;
use crate::values::payload::Payload;

// =============================================================================
// Captured deleter
// =============================================================================

/// Owns a payload through an [`AllocBox`] with a captured deleter.
pub struct CapturedHolder<'r> {
    alloc: AllocatorHandle<'r>,
    payload: Option<AllocBox<Payload<'r>, HandleDeleter<'r>>>,
}

impl<'r> CapturedHolder<'r> {
    /// A holder whose payload holds `text`.
    pub fn with_text(text: &str, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = AllocBox::try_new_with(alloc, |alloc| Payload::with_text(text, alloc))?;
        Ok(Self {
            alloc,
            payload: Some(payload),
        })
    }

    /// The owned payload, if not moved-from.
    pub fn payload(&self) -> Option<&Payload<'r>> {
        self.payload.as_deref()
    }

    /// The payload text, empty when moved-from.
    pub fn text(&self) -> &str {
        self.payload().map_or("", Payload::as_str)
    }

    /// Whether the payload was stolen.
    pub fn is_moved_from(&self) -> bool {
        self.payload.is_none()
    }
}

impl<'r> AllocatorAware<'r> for CapturedHolder<'r> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        self.alloc
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = AllocBox::try_new_with(alloc, Payload::new_in)?;
        Ok(Self {
            alloc,
            payload: Some(payload),
        })
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = match self.payload() {
            Some(theirs) => Some(AllocBox::try_new_with(alloc, |alloc| theirs.clone_in(alloc))?),
            None => None,
        };
        Ok(Self { alloc, payload })
    }

    fn steal(source: &mut Self) -> Self {
        Self {
            alloc: source.alloc,
            payload: source.payload.take(),
        }
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        match (self.payload.as_deref_mut(), other.payload()) {
            (Some(mine), Some(theirs)) => mine.assign(theirs),
            (None, Some(theirs)) => {
                self.payload = Some(AllocBox::try_new_with(self.alloc, |alloc| theirs.clone_in(alloc))?);
                Ok(())
            }
            (_, None) => {
                self.payload = None;
                Ok(())
            }
        }
    }
}

impl fmt::Debug for CapturedHolder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedHolder").field("payload", &self.payload()).finish()
    }
}

// =============================================================================
// Embedded handle
// =============================================================================

/// Owns a payload through a raw pointer and one stored handle.
pub struct EmbeddedHolder<'r> {
    payload: Option<NonNull<Payload<'r>>>,
    alloc: AllocatorHandle<'r>,
    _owns: PhantomData<Payload<'r>>,
}

impl<'r> EmbeddedHolder<'r> {
    /// A holder whose payload holds `text`.
    pub fn with_text(text: &str, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = alloc.new_object_with(|alloc| Payload::with_text(text, alloc))?;
        Ok(Self::from_parts(Some(payload), alloc))
    }

    fn from_parts(payload: Option<NonNull<Payload<'r>>>, alloc: AllocatorHandle<'r>) -> Self {
        Self {
            payload,
            alloc,
            _owns: PhantomData,
        }
    }

    /// The owned payload, if not moved-from.
    pub fn payload(&self) -> Option<&Payload<'r>> {
        // SAFETY: a present pointer refers to a live payload we own.
        self.payload.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    fn payload_mut(&mut self) -> Option<&mut Payload<'r>> {
        // SAFETY: as above, and `&mut self` makes the access exclusive.
        self.payload.map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    /// The payload text, empty when moved-from.
    pub fn text(&self) -> &str {
        self.payload().map_or("", Payload::as_str)
    }

    /// Whether the payload was stolen.
    pub fn is_moved_from(&self) -> bool {
        self.payload.is_none()
    }
}

impl<'r> AllocatorAware<'r> for EmbeddedHolder<'r> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        self.alloc
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = alloc.new_object_with(Payload::new_in)?;
        Ok(Self::from_parts(Some(payload), alloc))
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = match self.payload() {
            Some(theirs) => Some(alloc.new_object_with(|alloc| theirs.clone_in(alloc))?),
            None => None,
        };
        Ok(Self::from_parts(payload, alloc))
    }

    fn steal(source: &mut Self) -> Self {
        Self::from_parts(source.payload.take(), source.alloc)
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        let alloc = self.alloc;
        match (self.payload_mut(), other.payload()) {
            (Some(mine), Some(theirs)) => mine.assign(theirs),
            (None, Some(theirs)) => {
                self.payload = Some(alloc.new_object_with(|alloc| theirs.clone_in(alloc))?);
                Ok(())
            }
            (_, None) => {
                if let Some(ptr) = self.payload.take() {
                    // SAFETY: allocated from `alloc` and owned by us.
                    unsafe { emplace::destroy_in(ptr, alloc) };
                }
                Ok(())
            }
        }
    }
}

impl Drop for EmbeddedHolder<'_> {
    fn drop(&mut self) {
        if let Some(ptr) = self.payload.take() {
            // SAFETY: allocated from `alloc` and owned by us.
            unsafe { emplace::destroy_in(ptr, self.alloc) };
        }
    }
}

impl fmt::Debug for EmbeddedHolder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedHolder").field("payload", &self.payload()).finish()
    }
}

// SAFETY: the holder owns its payload exclusively, and payloads and handles
// are Send + Sync.
unsafe impl Send for EmbeddedHolder<'_> {}
unsafe impl Sync for EmbeddedHolder<'_> {}

// =============================================================================
// Delegated handle
// =============================================================================

/// Owns a payload through a bare pointer; the payload knows its allocator.
///
/// A moved-from holder owns nothing, so it has no allocator of its own:
/// [`allocator`](AllocatorAware::allocator) then reports the current
/// default handle, and copies of it are empty holders.
///
/// Unlike the other holders, a moved-from `DelegatedHolder` does not keep
/// the allocator it was built with. Assigning into one allocates from the
/// default resource, and `clone_in(alloc)` of one reports the default
/// handle rather than `alloc`.
pub struct DelegatedHolder<'r> {
    payload: Option<NonNull<Payload<'r>>>,
    _owns: PhantomData<Payload<'r>>,
}

impl<'r> DelegatedHolder<'r> {
    /// A holder whose payload holds `text`.
    pub fn with_text(text: &str, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = alloc.new_object_with(|alloc| Payload::with_text(text, alloc))?;
        Ok(Self::from_ptr(Some(payload)))
    }

    fn from_ptr(payload: Option<NonNull<Payload<'r>>>) -> Self {
        Self {
            payload,
            _owns: PhantomData,
        }
    }

    /// The owned payload, if not moved-from.
    pub fn payload(&self) -> Option<&Payload<'r>> {
        // SAFETY: a present pointer refers to a live payload we own.
        self.payload.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    fn payload_mut(&mut self) -> Option<&mut Payload<'r>> {
        // SAFETY: as above, and `&mut self` makes the access exclusive.
        self.payload.map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    /// The payload text, empty when moved-from.
    pub fn text(&self) -> &str {
        self.payload().map_or("", Payload::as_str)
    }

    /// Whether the payload was stolen.
    pub fn is_moved_from(&self) -> bool {
        self.payload.is_none()
    }

    fn release(&mut self) {
        if let Some(ptr) = self.payload.take() {
            // SAFETY: a payload is allocated from its own allocator, which
            // is read before it is destroyed.
            unsafe {
                let alloc = ptr.as_ref().allocator();
                emplace::destroy_in(ptr, alloc);
            }
        }
    }
}

impl<'r> AllocatorAware<'r> for DelegatedHolder<'r> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        self.payload().map(Payload::allocator).unwrap_or_default()
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = alloc.new_object_with(Payload::new_in)?;
        Ok(Self::from_ptr(Some(payload)))
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let payload = match self.payload() {
            Some(theirs) => Some(alloc.new_object_with(|alloc| theirs.clone_in(alloc))?),
            None => None,
        };
        Ok(Self::from_ptr(payload))
    }

    fn steal(source: &mut Self) -> Self {
        Self::from_ptr(source.payload.take())
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        let alloc = self.allocator();
        match (self.payload_mut(), other.payload()) {
            (Some(mine), Some(theirs)) => mine.assign(theirs),
            (None, Some(theirs)) => {
                self.payload = Some(alloc.new_object_with(|alloc| theirs.clone_in(alloc))?);
                Ok(())
            }
            (_, None) => {
                self.release();
                Ok(())
            }
        }
    }
}

impl Drop for DelegatedHolder<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for DelegatedHolder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedHolder").field("payload", &self.payload()).finish()
    }
}

// SAFETY: the holder owns its payload exclusively, and payloads are Send + Sync.
unsafe impl Send for DelegatedHolder<'_> {}
unsafe impl Sync for DelegatedHolder<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{CountingResource, NewDeleteResource};
    use std::mem::size_of;

    #[test]
    fn test_storage_size_ordering() {
        assert!(size_of::<DelegatedHolder<'static>>() < size_of::<EmbeddedHolder<'static>>());
        assert!(size_of::<EmbeddedHolder<'static>>() < size_of::<CapturedHolder<'static>>());
        assert_eq!(size_of::<DelegatedHolder<'static>>(), size_of::<usize>());
        assert_eq!(
            size_of::<EmbeddedHolder<'static>>(),
            size_of::<usize>() + size_of::<AllocatorHandle<'static>>()
        );
    }

    #[test]
    fn test_each_form_releases_everything() {
        let counting = CountingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::new(&counting);

        {
            let captured = CapturedHolder::new_in(alloc).unwrap();
            let embedded = EmbeddedHolder::new_in(alloc).unwrap();
            let delegated = DelegatedHolder::new_in(alloc).unwrap();

            // Payload object plus its text, per holder.
            assert_eq!(counting.outstanding(), 6);
            assert_eq!(captured.text(), "data");
            assert_eq!(embedded.text(), "data");
            assert_eq!(delegated.text(), "data");
        }

        assert!(counting.stats().is_balanced());
    }

    #[test]
    fn test_delegated_reads_allocator_from_payload() {
        let heap = NewDeleteResource::new();
        let holder = DelegatedHolder::with_text("lorem", AllocatorHandle::new(&heap)).unwrap();

        assert_eq!(holder.allocator(), AllocatorHandle::new(&heap));
    }

    #[test]
    fn test_steal_transfers_payload() {
        let counting = CountingResource::new(NewDeleteResource::new());
        let alloc = AllocatorHandle::new(&counting);
        let mut source = EmbeddedHolder::with_text("ipsum", alloc).unwrap();
        let before = counting.stats().allocation_count;

        let stolen = EmbeddedHolder::steal(&mut source);

        assert_eq!(counting.stats().allocation_count, before);
        assert_eq!(stolen.text(), "ipsum");
        assert!(source.is_moved_from());
        assert_eq!(source.allocator(), alloc);
    }

    #[test]
    fn test_clone_of_moved_from_delegated_is_empty() {
        let heap = NewDeleteResource::new();
        let mut source = DelegatedHolder::new_in(AllocatorHandle::new(&heap)).unwrap();
        let _stolen = DelegatedHolder::steal(&mut source);

        let copy = source.clone_in(AllocatorHandle::new(&heap)).unwrap();

        assert!(copy.is_moved_from());
        assert_eq!(copy.text(), "");
        // Neither keeps `heap`: the default slot only holds 'static resources.
        assert_ne!(source.allocator(), AllocatorHandle::new(&heap));
        assert_ne!(copy.allocator(), AllocatorHandle::new(&heap));
    }

    #[test]
    fn test_assign_into_moved_from_allocates_in_own_resource() {
        let first = CountingResource::new(NewDeleteResource::new());
        let second = CountingResource::new(NewDeleteResource::new());
        let mut target = CapturedHolder::new_in(AllocatorHandle::new(&first)).unwrap();
        let _stolen = CapturedHolder::steal(&mut target);
        let other = CapturedHolder::with_text("amet", AllocatorHandle::new(&second)).unwrap();

        target.assign(&other).unwrap();

        assert_eq!(target.text(), "amet");
        assert_eq!(target.allocator(), AllocatorHandle::new(&first));
        assert_eq!(first.outstanding(), 4);
        assert_eq!(second.outstanding(), 2);
    }
}

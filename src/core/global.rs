//! The default-resource slot.
//!
//! Holds the resource an [`AllocatorHandle`](crate::AllocatorHandle) binds to
//! when it is default-constructed. The slot is read once, at handle
//! construction; changing it later never retargets existing handles.
//!
//! The slot is guarded by a mutex so set/get are safe from any thread.
//! Only `'static` resources can be installed, which rules out a handle
//! outliving the resource it was defaulted to.

use crate::resources::{new_delete_resource, MemoryResource};
use crate::sync::mutex::Mutex;

/// `None` means "fall back to the heap resource".
static DEFAULT_RESOURCE: Mutex<Option<&'static dyn MemoryResource>> = Mutex::new(None);

/// The resource default-constructed handles currently bind to.
pub fn get_default_resource() -> &'static dyn MemoryResource {
    match *DEFAULT_RESOURCE.lock() {
        Some(resource) => resource,
        None => new_delete_resource(),
    }
}

/// Install `resource` (or the heap resource for `None`) as the default.
///
/// Returns the previously effective default.
pub fn set_default_resource(resource: Option<&'static dyn MemoryResource>) -> &'static dyn MemoryResource {
    let previous = std::mem::replace(&mut *DEFAULT_RESOURCE.lock(), resource);
    match previous {
        Some(resource) => resource,
        None => new_delete_resource(),
    }
}

/// Installs a default resource and restores the previous slot on drop.
///
/// # Example
///
/// ```rust
/// use pmralloc::{get_default_resource, new_delete_resource, same_resource};
/// use pmralloc::{DefaultResourceGuard, LoggingResource, NewDeleteResource};
///
/// static HEAP: NewDeleteResource = NewDeleteResource::new();
/// static LOGGING: LoggingResource<&NewDeleteResource> = LoggingResource::new(&HEAP);
///
/// {
///     let _guard = DefaultResourceGuard::install(&LOGGING);
///     assert!(same_resource(get_default_resource(), &LOGGING));
/// }
/// assert!(same_resource(get_default_resource(), new_delete_resource()));
/// ```
pub struct DefaultResourceGuard {
    previous: Option<&'static dyn MemoryResource>,
}

impl DefaultResourceGuard {
    /// Install `resource` until the guard is dropped.
    pub fn install(resource: &'static dyn MemoryResource) -> Self {
        let previous = std::mem::replace(&mut *DEFAULT_RESOURCE.lock(), Some(resource));
        Self { previous }
    }
}

impl Drop for DefaultResourceGuard {
    fn drop(&mut self) {
        *DEFAULT_RESOURCE.lock() = self.previous;
    }
}

/// Serializes unit tests that swap the process-wide default.
#[cfg(test)]
pub(crate) static SLOT_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{same_resource, LoggingResource, NewDeleteResource};

    static ALTERNATE: NewDeleteResource = NewDeleteResource::new();
    static LOGGING: LoggingResource<&'static NewDeleteResource> = LoggingResource::new(&ALTERNATE);

    #[test]
    fn test_unset_slot_is_heap() {
        let _lock = SLOT_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        assert!(same_resource(get_default_resource(), new_delete_resource()));
    }

    #[test]
    fn test_set_returns_previous() {
        let _lock = SLOT_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let previous = set_default_resource(Some(&ALTERNATE));
        assert!(same_resource(previous, new_delete_resource()));
        assert!(same_resource(get_default_resource(), &ALTERNATE));

        let previous = set_default_resource(None);
        assert!(same_resource(previous, &ALTERNATE));
        assert!(same_resource(get_default_resource(), new_delete_resource()));
    }

    #[test]
    fn test_guard_nests() {
        let _lock = SLOT_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        {
            let _outer = DefaultResourceGuard::install(&ALTERNATE);
            {
                let _inner = DefaultResourceGuard::install(&LOGGING);
                assert!(same_resource(get_default_resource(), &LOGGING));
            }
            assert!(same_resource(get_default_resource(), &ALTERNATE));
        }
        assert!(same_resource(get_default_resource(), new_delete_resource()));
    }
}

//! The lock guarding resource state and the default-resource slot.
//!
//! Backed by `parking_lot` when the feature is enabled, by `std` otherwise.
//! The std flavour ignores poisoning: every critical section in this crate
//! leaves its data consistent before any call that could panic.

use std::ops::{Deref, DerefMut};

#[cfg(feature = "parking_lot")]
type Inner<T> = parking_lot::Mutex<T>;
#[cfg(feature = "parking_lot")]
type InnerGuard<'a, T> = parking_lot::MutexGuard<'a, T>;

#[cfg(not(feature = "parking_lot"))]
type Inner<T> = std::sync::Mutex<T>;
#[cfg(not(feature = "parking_lot"))]
type InnerGuard<'a, T> = std::sync::MutexGuard<'a, T>;

/// A mutex usable in `static` items.
pub struct Mutex<T>(Inner<T>);

/// Exclusive access to the protected value.
pub struct MutexGuard<'a, T>(InnerGuard<'a, T>);

impl<T> Mutex<T> {
    /// Create a new mutex.
    pub const fn new(value: T) -> Self {
        Self(Inner::new(value))
    }

    /// Lock the mutex, blocking until it is available.
    #[cfg(feature = "parking_lot")]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        MutexGuard(self.0.lock())
    }

    /// Lock the mutex, blocking until it is available.
    #[cfg(not(feature = "parking_lot"))]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        MutexGuard(self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }

    /// Access the value through `&mut self`, without locking.
    #[cfg(feature = "parking_lot")]
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }

    /// Access the value through `&mut self`, without locking.
    #[cfg(not(feature = "parking_lot"))]
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

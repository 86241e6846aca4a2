//! A text payload, the sub-object the holder types own.

use std::fmt;

use allocator_api2::vec::Vec;

use crate::api::aware::AllocatorAware;
use crate::api::handle::AllocatorHandle;
use crate::error::Result;

/// Text a default payload starts with.
pub const DEFAULT_TEXT: &str = "data";

/// UTF-8 text stored in a resource.
///
/// A default payload holds one heap allocation: its text.
pub struct Payload<'r> {
    /// Always valid UTF-8: only ever filled from `&str`
    text: Vec<u8, AllocatorHandle<'r>>,
}

impl<'r> Payload<'r> {
    /// A payload holding a copy of `text`.
    pub fn with_text(text: &str, alloc: AllocatorHandle<'r>) -> Result<Self> {
        let mut bytes = Vec::new_in(alloc);
        bytes.try_reserve_exact(text.len())?;
        bytes.extend_from_slice(text.as_bytes());
        Ok(Self { text: bytes })
    }

    /// The text.
    pub fn as_str(&self) -> &str {
        // SAFETY: `text` is only written from `&str` contents.
        unsafe { std::str::from_utf8_unchecked(&self.text) }
    }

    /// Replace the text in the payload's own resource.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        self.text.clear();
        self.text.try_reserve_exact(text.len())?;
        self.text.extend_from_slice(text.as_bytes());
        Ok(())
    }

    /// Length of the text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl<'r> AllocatorAware<'r> for Payload<'r> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        *self.text.allocator()
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        Self::with_text(DEFAULT_TEXT, alloc)
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        Self::with_text(self.as_str(), alloc)
    }

    fn steal(source: &mut Self) -> Self {
        Self {
            text: AllocatorAware::steal(&mut source.text),
        }
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        self.text.assign(&other.text)
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.as_str()).finish()
    }
}

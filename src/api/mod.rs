//! Public API for pmralloc.
//!
//! Handles, the allocator-aware protocol, and the owning types built on
//! it. Most users only need the types re-exported at the crate root.

pub mod aware;
pub mod boxed;
pub mod config;
pub mod handle;
pub mod stats;
pub mod vec;

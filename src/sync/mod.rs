//! Synchronization primitives.
//!
//! Resources and the default-resource slot are shared through `&'static`
//! references, so their interior state sits behind these wrappers.

pub(crate) mod atomics;
pub(crate) mod mutex;

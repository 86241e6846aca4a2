//! Ready-made allocator-aware values.
//!
//! `Record` and `Payload` are leaf values over `allocator_api2` vectors.
//! The holders own a `Payload` sub-object in three layouts, and `Tracked`
//! exists to watch container behaviour under failing moves.

pub mod holders;
pub mod payload;
pub mod record;
pub mod tracked;

pub use holders::{CapturedHolder, DelegatedHolder, EmbeddedHolder};
pub use payload::{Payload, DEFAULT_TEXT};
pub use record::{IntVec, Record};
pub use tracked::{FaultPlan, Tracked};

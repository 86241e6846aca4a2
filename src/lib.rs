//! # pmralloc
//!
//! Polymorphic memory resources and allocator-aware values for Rust.
//!
//! ## Features
//!
//! - Pluggable memory resources behind one `unsafe` trait
//! - Logging, buffered-arena and counting decorators
//! - Copyable allocator handles, usable as `allocator_api2` allocators
//! - A default-resource slot with scoped overrides
//! - The allocator-aware protocol: copy, steal and extended move with
//!   explicit propagation rules
//! - Owning pointers with captured or embedded deleters
//! - A container whose relocation strategy is explicit
//! - Coded diagnostics through the `log` facade
//!
//! ## Propagation rules
//!
//! - A copy uses the handle it is given (or the default), never the source's.
//! - A plain move keeps the source's handle and steals its storage.
//! - An extended move steals when handles are equal, copies otherwise.
//! - Assignment never changes which resource backs the receiver.
//!
//! ## Quick Start
//!
//! ```rust
//! use pmralloc::{construct, AllocatorAware, AllocatorHandle, LoggingResource,
//!                NewDeleteResource, Record, Source};
//!
//! let logging = LoggingResource::new(NewDeleteResource::new());
//! let alloc = AllocatorHandle::new(&logging);
//!
//! let mut original = Record::with_values(33, &[1, 2, 3], alloc).unwrap();
//!
//! // Same handle: storage is stolen, nothing is allocated.
//! let before = logging.allocation_count();
//! let moved: Record = construct(Source::Owned(&mut original), Some(alloc)).unwrap();
//! assert_eq!(logging.allocation_count(), before);
//! assert_eq!(moved.values(), &[1, 2, 3]);
//! assert!(original.is_moved_from());
//!
//! // Different handle: a deep copy in the other resource.
//! let other = NewDeleteResource::new();
//! let copy = moved.clone_in(AllocatorHandle::new(&other)).unwrap();
//! assert_eq!(copy.allocator(), AllocatorHandle::new(&other));
//! ```

pub mod api;
pub mod diagnostics;
pub mod error;
pub mod resources;
pub mod values;

pub mod core;

mod sync;
mod util;

// Re-export public API at crate root for convenience
pub use api::aware::{construct, AllocatorAware, Source};
pub use api::boxed::{AllocBox, Deleter, HandleDeleter};
pub use api::config::{ResourceConfig, DEFAULT_JOURNAL_CAPACITY};
pub use api::handle::AllocatorHandle;
pub use api::stats::ResourceStats;
pub use api::vec::{AwareVec, RelocationPolicy};

// Resources
pub use resources::{
    new_delete_resource, same_resource, AllocationEvent, BufferedArenaResource, CountingResource,
    LoggingResource, MemoryResource, NewDeleteResource,
};

// Default-resource slot and construction helpers
pub use crate::core::emplace::{destroy_in, try_emplace, UninitSlot};
pub use crate::core::global::{get_default_resource, set_default_resource, DefaultResourceGuard};

// Errors
pub use error::{AllocError, Result};

// Diagnostics - Core types and predefined codes
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{PM001, PM002, PM003, PM101, PM102};

// Values
pub use values::{CapturedHolder, DelegatedHolder, EmbeddedHolder, FaultPlan, Payload, Record, Tracked};

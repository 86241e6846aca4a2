//! Error taxonomy shared by resources, handles and value types.

use std::alloc::Layout;

use thiserror::Error;

/// Failure raised while obtaining or initializing storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// A resource could not satisfy a request.
    #[error("out of memory: {size} bytes aligned to {align}")]
    OutOfMemory { size: usize, align: usize },

    /// A requested element count does not fit in a `Layout`.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// A sub-object initializer failed after its storage was obtained.
    ///
    /// The storage has already been returned by the time this surfaces.
    #[error("failed to construct {what}: {reason}")]
    Construction { what: &'static str, reason: String },
}

impl AllocError {
    /// Out-of-memory error describing `layout`.
    pub fn out_of_memory(layout: Layout) -> Self {
        Self::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Construction failure for a value of type `what`.
    pub fn construction(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Construction {
            what,
            reason: reason.into(),
        }
    }

    /// Whether this is a resource exhaustion rather than an initializer failure.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::CapacityOverflow)
    }
}

impl From<allocator_api2::collections::TryReserveError> for AllocError {
    fn from(err: allocator_api2::collections::TryReserveError) -> Self {
        use allocator_api2::collections::TryReserveErrorKind;

        match err.kind() {
            TryReserveErrorKind::CapacityOverflow => Self::CapacityOverflow,
            TryReserveErrorKind::AllocError { layout, .. } => Self::out_of_memory(layout),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = AllocError> = std::result::Result<T, E>;

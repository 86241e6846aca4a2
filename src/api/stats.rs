//! Allocation statistics.

/// Accounting snapshot of a [`CountingResource`](crate::CountingResource).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Successful allocations performed.
    pub allocation_count: u64,

    /// Deallocations performed.
    pub deallocation_count: u64,

    /// Requests refused because of the allocation limit.
    pub refused_count: u64,

    /// Bytes currently handed out.
    pub bytes_outstanding: usize,

    /// High water mark of `bytes_outstanding`.
    pub peak_bytes: usize,
}

impl ResourceStats {
    /// Allocations not yet returned.
    pub fn active_allocations(&self) -> u64 {
        self.allocation_count.saturating_sub(self.deallocation_count)
    }

    /// Whether every allocation has been returned.
    pub fn is_balanced(&self) -> bool {
        self.active_allocations() == 0 && self.bytes_outstanding == 0
    }
}

impl std::fmt::Display for ResourceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use crate::util::size::ByteSize;

        writeln!(f, "Resource Statistics:")?;
        writeln!(f, "  Allocations:     {}", self.allocation_count)?;
        writeln!(f, "  Deallocations:   {}", self.deallocation_count)?;
        writeln!(f, "  Refused:         {}", self.refused_count)?;
        writeln!(f, "  Active:          {}", self.active_allocations())?;
        writeln!(f, "  Outstanding:     {}", ByteSize(self.bytes_outstanding))?;
        writeln!(f, "  Peak:            {}", ByteSize(self.peak_bytes))?;
        Ok(())
    }
}

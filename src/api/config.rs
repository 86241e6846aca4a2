//! Resource configuration.

use crate::util::size::kb;

/// Journal entries a `LoggingResource` keeps unless configured otherwise.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

/// Configuration for the decorator resources.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Buffer size for arenas that own their buffer (default: 64 KB)
    pub arena_capacity: usize,

    /// Alignment of an owned arena buffer (default: 16)
    pub arena_alignment: usize,

    /// Level of the per-allocation record emitted by `LoggingResource`
    pub log_level: log::Level,

    /// Keep an in-memory journal of allocation events
    pub record_events: bool,

    /// Most recent journal entries kept; older ones are dropped (default: 1024)
    pub journal_capacity: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            arena_capacity: kb(64),
            arena_alignment: 16,
            log_level: log::Level::Info,
            record_events: true,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
        }
    }
}

impl ResourceConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            arena_capacity: kb(1),
            arena_alignment: 16,
            log_level: log::Level::Debug,
            record_events: false,
            journal_capacity: 64,
        }
    }

    /// Builder pattern: set owned arena capacity.
    pub fn with_arena_capacity(mut self, capacity: usize) -> Self {
        self.arena_capacity = capacity;
        self
    }

    /// Builder pattern: set owned arena alignment (power of two).
    pub fn with_arena_alignment(mut self, align: usize) -> Self {
        self.arena_alignment = align;
        self
    }

    /// Builder pattern: set the allocation log level.
    pub fn with_log_level(mut self, level: log::Level) -> Self {
        self.log_level = level;
        self
    }

    /// Builder pattern: enable the event journal.
    pub fn with_event_journal(mut self, enable: bool) -> Self {
        self.record_events = enable;
        self
    }

    /// Builder pattern: bound the event journal.
    pub fn with_journal_capacity(mut self, capacity: usize) -> Self {
        self.journal_capacity = capacity;
        self
    }
}

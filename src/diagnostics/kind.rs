//! Diagnostic kinds and predefined codes.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - an operation failed.
    Error,
    /// A warning - something is probably suboptimal.
    Warning,
    /// Informational.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }

    /// The `log` level records of this kind are emitted at.
    pub fn level(&self) -> log::Level {
        match self {
            DiagnosticKind::Error => log::Level::Error,
            DiagnosticKind::Warning => log::Level::Warn,
            DiagnosticKind::Note => log::Level::Debug,
        }
    }
}

/// A diagnostic message with code, message, and optional help.
///
/// Codes follow the pattern:
/// - `PM0xx` - resource behavior
/// - `PM1xx` - propagation decisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "PM001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            help: None,
        }
    }

    /// Create a new note.
    pub const fn note(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Note,
            code,
            message,
            help: None,
        }
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// PM0xx - Resources
// =============================================================================

/// PM001: Arena buffer exhausted, serving from the fallback resource.
pub const PM001: Diagnostic = Diagnostic::warning(
    "PM001",
    "arena buffer exhausted, allocation served by fallback resource",
)
.with_help("size the arena buffer for the expected working set");

/// PM002: A resource refused an allocation.
pub const PM002: Diagnostic = Diagnostic::error("PM002", "memory resource could not satisfy allocation");

/// PM003: Partially constructed object rolled back.
pub const PM003: Diagnostic = Diagnostic::note(
    "PM003",
    "initializer failed after allocation, storage returned to its resource",
);

// =============================================================================
// PM1xx - Propagation
// =============================================================================

/// PM101: Extended move across unequal allocators degraded to a copy.
pub const PM101: Diagnostic = Diagnostic::note(
    "PM101",
    "move across unequal allocators performed as a deep copy",
);

/// PM102: Container relocation routed through the allocating move.
pub const PM102: Diagnostic = Diagnostic::warning(
    "PM102",
    "container relocation uses the fallible extended move",
)
.with_help("use RelocationPolicy::PreferInfallibleMove so a failed push leaves elements untouched");

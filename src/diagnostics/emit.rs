//! Diagnostic emission backend.
//!
//! Routes diagnostics to the `log` facade.

use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::Diagnostic;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic through the `log` crate.
pub fn emit(diag: &Diagnostic) {
    if is_suppressed() {
        return;
    }

    let level = diag.kind.level();
    log::log!(
        target: "pmralloc",
        level,
        "[{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );
    if let Some(help) = diag.help {
        log::log!(target: "pmralloc", level, "  help: {}", help);
    }
}

/// Emit a diagnostic with additional runtime context.
pub fn emit_with_context(diag: &Diagnostic, context: std::fmt::Arguments<'_>) {
    if is_suppressed() {
        return;
    }

    let level = diag.kind.level();
    log::log!(
        target: "pmralloc",
        level,
        "[{}] {}: {} ({})",
        diag.code,
        diag.kind.prefix(),
        diag.message,
        context
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::PM001;

    #[test]
    fn test_suppression() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        emit(&PM001);
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }

    #[test]
    fn test_codes_carry_levels() {
        assert_eq!(PM001.kind.level(), log::Level::Warn);
        assert_eq!(PM001.code, "PM001");
        assert!(PM001.help.is_some());
    }
}

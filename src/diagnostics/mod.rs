//! Diagnostics for resource and propagation decisions.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                                  |
//! |-------|------------------------------------------|
//! | PM001 | Arena exhausted, fallback used           |
//! | PM002 | Allocation refused by a resource         |
//! | PM003 | Construction rolled back                 |
//! | PM101 | Extended move degraded to a copy         |
//! | PM102 | Relocation through the extended move     |
//!
//! Everything is emitted through the `log` facade under the `pmralloc`
//! target; install any logger to see it.

pub mod emit;
pub mod kind;

pub use emit::{emit, emit_with_context, is_suppressed, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};
pub use kind::{PM001, PM002, PM003, PM101, PM102};

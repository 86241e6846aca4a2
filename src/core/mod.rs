//! Process-wide state and construction discipline.

pub mod emplace;
pub mod global;

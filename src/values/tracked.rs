//! A value that records being moved from, with injectable move failures.
//!
//! Used to observe what a container does to its elements when an insertion
//! fails part way.

use std::cell::Cell;

use crate::api::aware::AllocatorAware;
use crate::api::handle::AllocatorHandle;
use crate::diagnostics::{self, PM101};
use crate::error::{AllocError, Result};

/// Counts extended moves and fails one on request.
///
/// Shared by reference among the [`Tracked`] values it governs.
#[derive(Debug, Default)]
pub struct FaultPlan {
    moves: Cell<u64>,
    /// Moves left to admit before the armed failure
    armed: Cell<Option<u32>>,
}

impl FaultPlan {
    /// A plan that admits every move.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit the next `admitted` extended moves, then fail the one after.
    ///
    /// The failure fires once; later moves are admitted again.
    pub fn fail_after(&self, admitted: u32) {
        self.armed.set(Some(admitted));
    }

    /// Disarm a pending failure.
    pub fn disarm(&self) {
        self.armed.set(None);
    }

    /// Extended moves seen so far, failed one included.
    pub fn extended_moves(&self) -> u64 {
        self.moves.get()
    }

    fn admit(&self) -> Result<()> {
        self.moves.set(self.moves.get() + 1);
        match self.armed.get() {
            Some(0) => {
                self.armed.set(None);
                Err(AllocError::construction("Tracked", "injected move failure"))
            }
            Some(left) => {
                self.armed.set(Some(left - 1));
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// A handle-bearing value with no storage of its own.
///
/// A steal marks the source moved-from. The extended move consults the
/// value's [`FaultPlan`], if any, before doing anything else.
#[derive(Debug)]
pub struct Tracked<'r> {
    alloc: AllocatorHandle<'r>,
    tag: u32,
    moved_from: bool,
    plan: Option<&'r FaultPlan>,
}

impl<'r> Tracked<'r> {
    /// A value without a fault plan.
    pub fn new(tag: u32, alloc: AllocatorHandle<'r>) -> Self {
        Self {
            alloc,
            tag,
            moved_from: false,
            plan: None,
        }
    }

    /// A value whose extended moves are governed by `plan`.
    pub fn with_plan(tag: u32, alloc: AllocatorHandle<'r>, plan: &'r FaultPlan) -> Self {
        Self {
            plan: Some(plan),
            ..Self::new(tag, alloc)
        }
    }

    /// Get the tag.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Whether a steal has taken this value.
    pub fn is_moved_from(&self) -> bool {
        self.moved_from
    }
}

impl<'r> AllocatorAware<'r> for Tracked<'r> {
    fn allocator(&self) -> AllocatorHandle<'r> {
        self.alloc
    }

    fn new_in(alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok(Self::new(0, alloc))
    }

    fn clone_in(&self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        Ok(Self {
            alloc,
            tag: self.tag,
            moved_from: false,
            plan: self.plan,
        })
    }

    fn steal(source: &mut Self) -> Self {
        source.moved_from = true;
        Self {
            alloc: source.alloc,
            tag: source.tag,
            moved_from: false,
            plan: source.plan,
        }
    }

    fn assign(&mut self, other: &Self) -> Result<()> {
        self.tag = other.tag;
        self.moved_from = false;
        Ok(())
    }

    fn move_in(source: &mut Self, alloc: AllocatorHandle<'r>) -> Result<Self> {
        if let Some(plan) = source.plan {
            plan.admit()?;
        }

        if alloc == source.alloc {
            Ok(Self::steal(source))
        } else {
            diagnostics::emit(&PM101);
            source.clone_in(alloc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::NewDeleteResource;

    #[test]
    fn test_fault_fires_once() {
        let heap = NewDeleteResource::new();
        let alloc = AllocatorHandle::new(&heap);
        let plan = FaultPlan::new();
        let mut value = Tracked::with_plan(1, alloc, &plan);

        plan.fail_after(1);
        let first = Tracked::move_in(&mut value, alloc).unwrap();
        let mut value = first;
        assert!(Tracked::move_in(&mut value, alloc).is_err());
        assert!(!value.is_moved_from());
        assert!(Tracked::move_in(&mut value, alloc).is_ok());
        assert_eq!(plan.extended_moves(), 3);
    }

    #[test]
    fn test_plain_move_ignores_plan() {
        let heap = NewDeleteResource::new();
        let plan = FaultPlan::new();
        plan.fail_after(0);
        let mut value = Tracked::with_plan(7, AllocatorHandle::new(&heap), &plan);

        let stolen = Tracked::steal(&mut value);

        assert_eq!(stolen.tag(), 7);
        assert!(value.is_moved_from());
        assert_eq!(plan.extended_moves(), 0);
    }

    #[test]
    fn test_unequal_move_copies() {
        let first = NewDeleteResource::new();
        let second = NewDeleteResource::new();
        let mut value = Tracked::new(3, AllocatorHandle::new(&first));

        let moved = Tracked::move_in(&mut value, AllocatorHandle::new(&second)).unwrap();

        assert!(!value.is_moved_from());
        assert_eq!(moved.allocator(), AllocatorHandle::new(&second));
    }
}

//! The mutable-container header shared by `Ref`, `Array`, `Set` and `Dict`.
//!
//! §9 flags two source-language patterns that need a systems-language
//! redesign: a global `WeakMap`-keyed iteration-lock table, and a frozen
//! sentinel hung off a host object. Both become a plain header embedded in
//! every mutable container: a frozen flag and a lock counter. The counter
//! (rather than a boolean) allows nested nested iteration/sort/forEach over
//! the same container without one exit path releasing a lock still held by
//! an outer one.

use std::cell::Cell;

use crate::error::{EastError, EastResult};

/// Frozen flag + iteration-lock counter, embedded by value (not behind an
/// extra allocation) in every mutable container.
#[derive(Debug, Default)]
pub struct ContainerHeader {
    frozen: Cell<bool>,
    locks: Cell<u32>,
}

impl ContainerHeader {
    pub fn new() -> Self {
        ContainerHeader { frozen: Cell::new(false), locks: Cell::new(0) }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn is_locked(&self) -> bool {
        self.locks.get() > 0
    }

    /// Freezing is monotonic and cannot be undone (§5).
    pub fn freeze(&self) {
        if !self.frozen.replace(true) {
            tracing::debug!("container frozen");
        }
    }

    /// Checked before every mutating operator (§3.3, §4.E.4 rule 1/2).
    pub fn check_mutable(&self) -> EastResult<()> {
        if self.frozen.get() {
            tracing::trace!("mutation rejected: container is frozen");
            return Err(EastError::frozen_mutation());
        }
        if self.locks.get() > 0 {
            tracing::trace!("mutation rejected: container has an outstanding iteration lock");
            return Err(EastError::concurrent_mutation());
        }
        Ok(())
    }

    /// Acquire an iteration lock for the duration of a scope. The returned
    /// guard releases the lock on `Drop`, which runs on every exit path:
    /// normal return, early `break`/`continue`/`return` unwind, or an
    /// error propagating out via `?`.
    pub fn acquire_lock(&self) -> LockGuard<'_> {
        self.locks.set(self.locks.get() + 1);
        LockGuard { header: self }
    }
}

/// RAII iteration lock. See `ContainerHeader::acquire_lock`.
pub struct LockGuard<'a> {
    header: &'a ContainerHeader,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let count = self.header.locks.get();
        debug_assert!(count > 0, "lock guard dropped with no outstanding lock");
        self.header.locks.set(count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_is_idempotent_and_monotonic() {
        let h = ContainerHeader::new();
        assert!(h.check_mutable().is_ok());
        h.freeze();
        h.freeze();
        assert!(matches!(h.check_mutable(), Err(EastError::FrozenMutation { .. })));
    }

    #[test]
    fn lock_releases_on_drop_and_nests() {
        let h = ContainerHeader::new();
        {
            let _g1 = h.acquire_lock();
            assert!(h.is_locked());
            {
                let _g2 = h.acquire_lock();
                assert!(matches!(h.check_mutable(), Err(EastError::ConcurrentMutation { .. })));
            }
            // still locked by the outer guard
            assert!(h.is_locked());
        }
        assert!(!h.is_locked());
        assert!(h.check_mutable().is_ok());
    }
}

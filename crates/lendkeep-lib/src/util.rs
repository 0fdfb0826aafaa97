//! Identity generation.

use crate::error::{LendError, Result};

/// Monotonic identity generator owned by a single store.
///
/// Identities start at 1 and are never handed out twice, even after the
/// entity that used one is removed. The generator is persisted with the
/// snapshot so this holds across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume from a persisted value. Values below 1 are clamped.
    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self { next: next.max(1) }
    }

    /// The identity the next call to `allocate` will return.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.next
    }

    /// Hand out the next identity.
    ///
    /// # Errors
    ///
    /// Returns `Validation` once the identity space is used up.
    pub fn allocate(&mut self) -> Result<u64> {
        let id = self.next;
        self.next = advance(id)?;
        Ok(id)
    }

    /// Make sure an externally supplied identity is never handed out later.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `id` leaves no room for a successor.
    pub fn observe(&mut self, id: u64) -> Result<()> {
        if id >= self.next {
            self.next = advance(id)?;
        }
        Ok(())
    }
}

fn advance(id: u64) -> Result<u64> {
    id.checked_add(1)
        .ok_or_else(|| LendError::validation("id", format!("{id} exhausts the identity space")))
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

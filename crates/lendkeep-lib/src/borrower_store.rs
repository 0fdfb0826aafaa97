//! In-memory borrower registry.
//!
//! Owns borrower identity and each borrower's held set. Item IDs are
//! opaque here; nothing checks that they resolve in the catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{LendError, Result};
use crate::model::{Borrower, BorrowerDraft, BorrowerId, ItemId};
use crate::util::IdSequence;

/// Registry keyed by `BorrowerId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowerStore {
    borrowers: BTreeMap<BorrowerId, Borrower>,
    ids: IdSequence,
}

impl BorrowerStore {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from loaded borrowers.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if two borrowers share an ID.
    pub fn from_borrowers(
        borrowers: impl IntoIterator<Item = Borrower>,
        next_id: u64,
    ) -> Result<Self> {
        let mut store = Self {
            borrowers: BTreeMap::new(),
            ids: IdSequence::starting_at(next_id),
        };
        for borrower in borrowers {
            store.insert(borrower)?;
        }
        Ok(store)
    }

    /// Validate a draft, assign the next identity, and register.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the draft is invalid.
    pub fn create(&mut self, draft: BorrowerDraft, now: DateTime<Utc>) -> Result<&Borrower> {
        draft.validate()?;
        let id = BorrowerId(self.ids.allocate()?);
        let borrower = Borrower::new(id, draft, now)?;
        self.insert(borrower)?;
        self.get(id)
    }

    /// Register a borrower under its own identity.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if the ID already exists, or `Validation`
    /// if it leaves no room for later identities.
    pub fn insert(&mut self, borrower: Borrower) -> Result<()> {
        let id = borrower.id();
        if self.borrowers.contains_key(&id) {
            return Err(LendError::DuplicateIdentity {
                kind: "borrower",
                id: id.value(),
            });
        }
        self.ids.observe(id.value())?;
        self.borrowers.insert(id, borrower);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BorrowerNotFound` if the borrower doesn't exist.
    pub fn get(&self, id: BorrowerId) -> Result<&Borrower> {
        self.borrowers
            .get(&id)
            .ok_or(LendError::BorrowerNotFound { id })
    }

    /// Unregister a borrower.
    ///
    /// # Errors
    ///
    /// Returns `BorrowerNotFound` if absent, or `HasOutstandingHoldings`
    /// while the held set is nonempty.
    pub fn remove(&mut self, id: BorrowerId) -> Result<Borrower> {
        let borrower = self.get(id)?;
        if !borrower.held().is_empty() {
            return Err(LendError::HasOutstandingHoldings {
                id,
                count: borrower.held().len(),
            });
        }
        self.borrowers
            .remove(&id)
            .ok_or(LendError::BorrowerNotFound { id })
    }

    /// Record that a borrower holds an item.
    ///
    /// Adding an ID that is already held is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `BorrowerNotFound` if the borrower doesn't exist.
    pub fn add_held(&mut self, borrower_id: BorrowerId, item_id: ItemId) -> Result<&Borrower> {
        let borrower = self.get_mut(borrower_id)?;
        if !borrower.hold(item_id) {
            tracing::debug!(borrower = %borrower_id, item = %item_id, "add_held ignored: already held");
        }
        Ok(borrower)
    }

    /// Drop an item from a borrower's held set.
    ///
    /// # Errors
    ///
    /// Returns `BorrowerNotFound` if the borrower doesn't exist, or
    /// `NotHeld` if the item is not in the held set.
    pub fn remove_held(&mut self, borrower_id: BorrowerId, item_id: ItemId) -> Result<&Borrower> {
        let borrower = self.get_mut(borrower_id)?;
        if !borrower.release(item_id) {
            return Err(LendError::NotHeld {
                borrower: borrower_id,
                item: item_id,
            });
        }
        Ok(borrower)
    }

    /// Number of borrowers whose held set contains `item_id`.
    #[must_use]
    pub fn holders_of(&self, item_id: ItemId) -> usize {
        self.borrowers
            .values()
            .filter(|b| b.holds(item_id))
            .count()
    }

    /// Iterate all borrowers in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Borrower> {
        self.borrowers.values()
    }

    #[must_use]
    pub fn contains(&self, id: BorrowerId) -> bool {
        self.borrowers.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.borrowers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.borrowers.is_empty()
    }

    /// The identity the next `create` will assign.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.ids.peek()
    }

    fn get_mut(&mut self, id: BorrowerId) -> Result<&mut Borrower> {
        self.borrowers
            .get_mut(&id)
            .ok_or(LendError::BorrowerNotFound { id })
    }
}

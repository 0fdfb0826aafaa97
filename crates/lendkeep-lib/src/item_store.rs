//! In-memory catalog of items.
//!
//! Owns item identity and copy counts. Knows nothing about borrowers.
//! The store itself never touches disk; `Ledger` wraps every mutating
//! call with a snapshot write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{LendError, Result};
use crate::model::{Item, ItemDraft, ItemId};
use crate::util::IdSequence;

/// Catalog keyed by `ItemId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStore {
    items: BTreeMap<ItemId, Item>,
    ids: IdSequence,
}

impl ItemStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from loaded items.
    ///
    /// `next_id` is the persisted generator position; it is raised past the
    /// highest loaded identity if needed.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if two items share an ID.
    pub fn from_items(items: impl IntoIterator<Item = Item>, next_id: u64) -> Result<Self> {
        let mut store = Self {
            items: BTreeMap::new(),
            ids: IdSequence::starting_at(next_id),
        };
        for item in items {
            store.insert(item)?;
        }
        Ok(store)
    }

    // ========================================================================
    // Identity management
    // ========================================================================

    /// Validate a draft, assign the next identity, and store the item.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the draft is invalid. No identity is
    /// consumed in that case.
    pub fn create(&mut self, draft: ItemDraft, now: DateTime<Utc>) -> Result<&Item> {
        draft.validate()?;
        let id = ItemId(self.ids.allocate()?);
        let item = Item::new(id, draft, now)?;
        self.insert(item)?;
        self.get(id)
    }

    /// Store a new item under its own identity.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if the ID already exists, or `Validation`
    /// if it leaves no room for later identities.
    pub fn insert(&mut self, item: Item) -> Result<()> {
        let id = item.id();
        if self.items.contains_key(&id) {
            return Err(LendError::DuplicateIdentity {
                kind: "item",
                id: id.value(),
            });
        }
        self.ids.observe(id.value())?;
        self.items.insert(id, item);
        Ok(())
    }

    /// Get a single item by ID.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item doesn't exist.
    pub fn get(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or(LendError::ItemNotFound { id })
    }

    /// Remove an item from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if absent, or `HasOutstandingCopies` while
    /// any copy is out on loan.
    pub fn remove(&mut self, id: ItemId) -> Result<Item> {
        let item = self.get(id)?;
        if item.copies_out() > 0 {
            return Err(LendError::HasOutstandingCopies {
                id,
                outstanding: item.copies_out(),
            });
        }
        self.items.remove(&id).ok_or(LendError::ItemNotFound { id })
    }

    // ========================================================================
    // Copy accounting
    // ========================================================================

    /// Take one copy off the shelf.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if absent, or `NoCopiesAvailable` when the
    /// available count is already zero.
    pub fn decrement_available(&mut self, id: ItemId) -> Result<&Item> {
        let item = self.get_mut(id)?;
        if !item.take_copy() {
            return Err(LendError::NoCopiesAvailable { id });
        }
        Ok(item)
    }

    /// Put one copy back on the shelf.
    ///
    /// Silently does nothing if every copy is already back, which absorbs
    /// a double return.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if absent.
    pub fn increment_available(&mut self, id: ItemId) -> Result<&Item> {
        let item = self.get_mut(id)?;
        if !item.put_back_copy() {
            tracing::debug!(%id, "increment ignored: all copies already available");
        }
        Ok(item)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Iterate all items in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The identity the next `create` will assign.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.ids.peek()
    }

    fn get_mut(&mut self, id: ItemId) -> Result<&mut Item> {
        self.items.get_mut(&id).ok_or(LendError::ItemNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(copies: u32) -> (ItemStore, ItemId) {
        let mut store = ItemStore::new();
        let id = store
            .create(ItemDraft::new("Dune", "Frank Herbert", copies), Utc::now())
            .unwrap()
            .id();
        (store, id)
    }

    #[test]
    fn test_create_and_get() {
        let (store, id) = store_with(2);
        assert_eq!(id, ItemId(1));
        let item = store.get(id).unwrap();
        assert_eq!(item.title(), "Dune");
        assert_eq!(item.available_copies(), 2);
        assert_eq!(store.next_id(), 2);
    }

    #[test]
    fn test_invalid_draft_consumes_no_identity() {
        let mut store = ItemStore::new();
        assert!(store.create(ItemDraft::new("", "x", 1), Utc::now()).is_err());
        let id = store
            .create(ItemDraft::new("Emma", "Austen", 1), Utc::now())
            .unwrap()
            .id();
        assert_eq!(id, ItemId(1));
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let (mut store, id) = store_with(1);
        let dup = Item::new(id, ItemDraft::new("Other", "Someone", 1), Utc::now()).unwrap();
        let err = store.insert(dup).unwrap_err();
        assert!(matches!(err, LendError::DuplicateIdentity { kind: "item", id: 1 }));
    }

    #[test]
    fn test_insert_advances_generator() {
        let mut store = ItemStore::new();
        let item = Item::new(ItemId(7), ItemDraft::new("Emma", "Austen", 1), Utc::now()).unwrap();
        store.insert(item).unwrap();
        let next = store
            .create(ItemDraft::new("Persuasion", "Austen", 1), Utc::now())
            .unwrap()
            .id();
        assert_eq!(next, ItemId(8));
    }

    #[test]
    fn test_insert_max_identity_rejected() {
        let mut store = ItemStore::new();
        let item =
            Item::new(ItemId(u64::MAX), ItemDraft::new("Emma", "Austen", 1), Utc::now()).unwrap();
        let err = store.insert(item).unwrap_err();
        assert!(matches!(err, LendError::Validation { ref field, .. } if field == "id"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_missing() {
        let store = ItemStore::new();
        assert!(matches!(
            store.get(ItemId(9)),
            Err(LendError::ItemNotFound { id: ItemId(9) })
        ));
    }

    #[test]
    fn test_decrement_until_exhausted() {
        let (mut store, id) = store_with(1);
        let item = store.decrement_available(id).unwrap();
        assert_eq!(item.available_copies(), 0);
        assert!(!item.is_available());

        let err = store.decrement_available(id).unwrap_err();
        assert!(matches!(err, LendError::NoCopiesAvailable { .. }));
        assert_eq!(store.get(id).unwrap().available_copies(), 0);
    }

    #[test]
    fn test_increment_is_capped_at_total() {
        let (mut store, id) = store_with(2);
        assert_eq!(store.increment_available(id).unwrap().available_copies(), 2);

        store.decrement_available(id).unwrap();
        let item = store.increment_available(id).unwrap();
        assert_eq!(item.available_copies(), 2);
        assert!(item.is_available());
    }

    #[test]
    fn test_copy_accounting_on_missing_item() {
        let mut store = ItemStore::new();
        assert!(store.decrement_available(ItemId(1)).unwrap_err().is_not_found());
        assert!(store.increment_available(ItemId(1)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_with_outstanding_copies_blocked() {
        let (mut store, id) = store_with(3);
        store.decrement_available(id).unwrap();

        let err = store.remove(id).unwrap_err();
        assert!(matches!(
            err,
            LendError::HasOutstandingCopies { outstanding: 1, .. }
        ));

        store.increment_available(id).unwrap();
        let removed = store.remove(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(store.is_empty());
    }

    #[test]
    fn test_identity_not_reused_after_remove() {
        let (mut store, id) = store_with(1);
        store.remove(id).unwrap();
        let next = store
            .create(ItemDraft::new("Emma", "Austen", 1), Utc::now())
            .unwrap()
            .id();
        assert_eq!(next, ItemId(2));
    }

    #[test]
    fn test_from_items_rejects_duplicates() {
        let a = Item::new(ItemId(1), ItemDraft::new("A", "X", 1), Utc::now()).unwrap();
        let b = Item::new(ItemId(1), ItemDraft::new("B", "Y", 1), Utc::now()).unwrap();
        assert!(ItemStore::from_items([a, b], 2).is_err());
    }
}

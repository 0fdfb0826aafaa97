//! Core data types for lendkeep-lib.
//!
//! `Item` and `Borrower` can only be built through validating
//! constructors, so every value in a store satisfies its own invariants.
//! Mutation of copy counts and held sets is crate-private and goes
//! through the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{LendError, Result};

/// Catalog identity of an item. Displayed as `I-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Registry identity of a borrower. Displayed as `M-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BorrowerId(pub u64);

impl ItemId {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl BorrowerId {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I-{}", self.0)
    }
}

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// Parse `"I-12"`, `"i-12"` or `"12"`. Zero is rejected.
fn parse_prefixed(s: &str, prefix: char, field: &str) -> Result<u64> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix(prefix)
        .or_else(|| trimmed.strip_prefix(prefix.to_ascii_lowercase()))
        .map_or(trimmed, |rest| rest.strip_prefix('-').unwrap_or(rest));

    match digits.parse::<u64>() {
        Ok(0) => Err(LendError::validation(field, "must be a positive integer")),
        Ok(n) => Ok(n),
        Err(_) => Err(LendError::validation(
            field,
            format!("invalid identifier '{trimmed}'"),
        )),
    }
}

impl FromStr for ItemId {
    type Err = LendError;

    fn from_str(s: &str) -> Result<Self> {
        parse_prefixed(s, 'I', "item_id").map(Self)
    }
}

impl FromStr for BorrowerId {
    type Err = LendError;

    fn from_str(s: &str) -> Result<Self> {
        parse_prefixed(s, 'M', "borrower_id").map(Self)
    }
}

// ============================================================================
// Item
// ============================================================================

/// Fields supplied by the catalog collaborator when adding an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub catalog_code: Option<String>,
    pub copies: u32,
}

impl ItemDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>, copies: u32) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            publisher: None,
            catalog_code: None,
            copies,
        }
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    #[must_use]
    pub fn with_catalog_code(mut self, code: impl Into<String>) -> Self {
        self.catalog_code = Some(code.into());
        self
    }

    /// # Errors
    ///
    /// Returns `Validation` for an empty title or author, or zero copies.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(LendError::validation("title", "cannot be empty"));
        }
        if self.author.trim().is_empty() {
            return Err(LendError::validation("author", "cannot be empty"));
        }
        if self.copies == 0 {
            return Err(LendError::validation("copies", "must be at least 1"));
        }
        if let Some(code) = &self.catalog_code {
            if code.chars().any(char::is_whitespace) {
                return Err(LendError::validation(
                    "catalog_code",
                    "cannot contain whitespace",
                ));
            }
        }
        Ok(())
    }
}

/// A catalog entry with one or more identical copies.
///
/// Invariant: `1 <= total_copies` and `available_copies <= total_copies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    id: ItemId,
    title: String,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog_code: Option<String>,
    total_copies: u32,
    available_copies: u32,
    added_at: DateTime<Utc>,
}

impl Item {
    /// Build a fresh item with every copy on the shelf.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the draft is invalid or `id` is zero.
    pub fn new(id: ItemId, draft: ItemDraft, added_at: DateTime<Utc>) -> Result<Self> {
        if id.value() == 0 {
            return Err(LendError::validation("id", "must be positive"));
        }
        draft.validate()?;
        Ok(Self {
            id,
            title: draft.title.trim().to_string(),
            author: draft.author.trim().to_string(),
            publisher: draft.publisher,
            catalog_code: draft.catalog_code,
            total_copies: draft.copies,
            available_copies: draft.copies,
            added_at,
        })
    }

    /// Rebuild an item with an explicit available count (used when loading).
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the draft is invalid or `available > total`.
    pub fn with_available(
        id: ItemId,
        draft: ItemDraft,
        available: u32,
        added_at: DateTime<Utc>,
    ) -> Result<Self> {
        let mut item = Self::new(id, draft, added_at)?;
        if available > item.total_copies {
            return Err(LendError::validation(
                "available_copies",
                format!(
                    "{available} exceeds total copies {}",
                    item.total_copies
                ),
            ));
        }
        item.available_copies = available;
        Ok(item)
    }

    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[must_use]
    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }

    #[must_use]
    pub fn catalog_code(&self) -> Option<&str> {
        self.catalog_code.as_deref()
    }

    #[must_use]
    pub const fn total_copies(&self) -> u32 {
        self.total_copies
    }

    #[must_use]
    pub const fn available_copies(&self) -> u32 {
        self.available_copies
    }

    /// Copies currently out on loan.
    #[must_use]
    pub const fn copies_out(&self) -> u32 {
        self.total_copies - self.available_copies
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    #[must_use]
    pub const fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// Returns false (and changes nothing) when no copy is on the shelf.
    pub(crate) fn take_copy(&mut self) -> bool {
        if self.available_copies == 0 {
            return false;
        }
        self.available_copies -= 1;
        true
    }

    /// Returns false (and changes nothing) when every copy is already back.
    pub(crate) fn put_back_copy(&mut self) -> bool {
        if self.available_copies >= self.total_copies {
            return false;
        }
        self.available_copies += 1;
        true
    }
}

// ============================================================================
// Borrower
// ============================================================================

/// Fields supplied by the registration collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowerDraft {
    pub name: String,
    pub contact: String,
}

impl BorrowerDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `Validation` for an empty name.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LendError::validation("name", "cannot be empty"));
        }
        Ok(())
    }
}

/// A registered person who may hold items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Borrower {
    id: BorrowerId,
    name: String,
    contact: String,
    held: BTreeSet<ItemId>,
    registered_at: DateTime<Utc>,
}

impl Borrower {
    /// # Errors
    ///
    /// Returns `Validation` if the draft is invalid or `id` is zero.
    pub fn new(id: BorrowerId, draft: BorrowerDraft, registered_at: DateTime<Utc>) -> Result<Self> {
        if id.value() == 0 {
            return Err(LendError::validation("id", "must be positive"));
        }
        draft.validate()?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            contact: draft.contact.trim().to_string(),
            held: BTreeSet::new(),
            registered_at,
        })
    }

    /// Rebuild a borrower with an existing held set (used when loading).
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the draft is invalid.
    pub fn with_held(
        id: BorrowerId,
        draft: BorrowerDraft,
        held: BTreeSet<ItemId>,
        registered_at: DateTime<Utc>,
    ) -> Result<Self> {
        let mut borrower = Self::new(id, draft, registered_at)?;
        borrower.held = held;
        Ok(borrower)
    }

    #[must_use]
    pub const fn id(&self) -> BorrowerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn contact(&self) -> &str {
        &self.contact
    }

    #[must_use]
    pub const fn held(&self) -> &BTreeSet<ItemId> {
        &self.held
    }

    #[must_use]
    pub fn holds(&self, item: ItemId) -> bool {
        self.held.contains(&item)
    }

    #[must_use]
    pub const fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Returns false if the item was already in the held set.
    pub(crate) fn hold(&mut self, item: ItemId) -> bool {
        self.held.insert(item)
    }

    /// Returns false if the item was not in the held set.
    pub(crate) fn release(&mut self, item: ItemId) -> bool {
        self.held.remove(&item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_parse_forms() {
        assert_eq!("I-12".parse::<ItemId>().unwrap(), ItemId(12));
        assert_eq!("i-12".parse::<ItemId>().unwrap(), ItemId(12));
        assert_eq!("12".parse::<ItemId>().unwrap(), ItemId(12));
        assert_eq!(" I12 ".parse::<ItemId>().unwrap(), ItemId(12));
        assert!("0".parse::<ItemId>().is_err());
        assert!("I-x".parse::<ItemId>().is_err());
        assert_eq!("M-4".parse::<BorrowerId>().unwrap(), BorrowerId(4));
        assert!("I-4".parse::<BorrowerId>().is_err());
    }

    #[test]
    fn test_item_draft_validation() {
        assert!(ItemDraft::new("Dune", "Herbert", 1).validate().is_ok());
        assert!(ItemDraft::new("  ", "Herbert", 1).validate().is_err());
        assert!(ItemDraft::new("Dune", "", 1).validate().is_err());
        assert!(ItemDraft::new("Dune", "Herbert", 0).validate().is_err());
        assert!(
            ItemDraft::new("Dune", "Herbert", 1)
                .with_catalog_code("978 0441")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_new_item_starts_fully_available() {
        let item = Item::new(ItemId(1), ItemDraft::new(" Dune ", "Herbert", 3), Utc::now()).unwrap();
        assert_eq!(item.title(), "Dune");
        assert_eq!(item.total_copies(), 3);
        assert_eq!(item.available_copies(), 3);
        assert!(item.is_available());
        assert_eq!(item.copies_out(), 0);
    }

    #[test]
    fn test_with_available_rejects_overflow() {
        let draft = ItemDraft::new("Dune", "Herbert", 2);
        assert!(Item::with_available(ItemId(1), draft.clone(), 2, Utc::now()).is_ok());
        assert!(Item::with_available(ItemId(1), draft, 3, Utc::now()).is_err());
    }

    #[test]
    fn test_copy_counters_are_bounded() {
        let mut item = Item::new(ItemId(1), ItemDraft::new("Dune", "Herbert", 1), Utc::now()).unwrap();
        assert!(!item.put_back_copy());
        assert!(item.take_copy());
        assert!(!item.is_available());
        assert!(!item.take_copy());
        assert_eq!(item.available_copies(), 0);
        assert!(item.put_back_copy());
        assert_eq!(item.available_copies(), 1);
    }

    #[test]
    fn test_borrower_hold_release() {
        let mut borrower =
            Borrower::new(BorrowerId(1), BorrowerDraft::new("Ada", "ada@example.org"), Utc::now())
                .unwrap();
        assert!(borrower.hold(ItemId(5)));
        assert!(!borrower.hold(ItemId(5)));
        assert!(borrower.holds(ItemId(5)));
        assert!(borrower.release(ItemId(5)));
        assert!(!borrower.release(ItemId(5)));
        assert!(borrower.held().is_empty());
    }

    #[test]
    fn test_borrower_requires_name() {
        let err = Borrower::new(BorrowerId(1), BorrowerDraft::new("", ""), Utc::now()).unwrap_err();
        assert!(matches!(err, LendError::Validation { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_zero_identity_rejected() {
        let err = Item::new(ItemId(0), ItemDraft::new("Dune", "Herbert", 1), Utc::now()).unwrap_err();
        assert!(matches!(err, LendError::Validation { ref field, .. } if field == "id"));

        let err = Borrower::new(BorrowerId(0), BorrowerDraft::new("Ada", ""), Utc::now()).unwrap_err();
        assert!(matches!(err, LendError::Validation { ref field, .. } if field == "id"));
    }
}

//! Write-through owner of both stores.
//!
//! Every mutation is applied to a staging copy of the stores, the staged
//! state is saved through the gateway, and only then swapped in. A failed
//! mutation or a failed save leaves the live state as it was.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::borrower_store::BorrowerStore;
use crate::error::{LendError, Result};
use crate::item_store::ItemStore;
use crate::model::{Borrower, BorrowerDraft, BorrowerId, Item, ItemDraft, ItemId};
use crate::snapshot::{PersistenceGateway, Snapshot};

// ============================================================================
// Relationship invariant
// ============================================================================

/// A breach of the item/borrower relationship invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// `total - available` disagrees with the number of holders.
    CountMismatch {
        item: ItemId,
        copies_out: u32,
        holders: usize,
    },
    /// A borrower holds an identity missing from the catalog.
    DanglingHolding { borrower: BorrowerId, item: ItemId },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountMismatch {
                item,
                copies_out,
                holders,
            } => write!(
                f,
                "item {item} has {copies_out} copies out but {holders} holder(s)"
            ),
            Self::DanglingHolding { borrower, item } => {
                write!(f, "borrower {borrower} holds unknown item {item}")
            }
        }
    }
}

/// Check that every item's outstanding count matches its holders and
/// that no borrower holds an unknown item.
#[must_use]
pub fn check_relationships(
    items: &ItemStore,
    borrowers: &BorrowerStore,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut holders: BTreeMap<ItemId, usize> = BTreeMap::new();

    for borrower in borrowers.iter() {
        for &item in borrower.held() {
            if items.contains(item) {
                *holders.entry(item).or_default() += 1;
            } else {
                violations.push(InvariantViolation::DanglingHolding {
                    borrower: borrower.id(),
                    item,
                });
            }
        }
    }

    for item in items.iter() {
        let count = holders.get(&item.id()).copied().unwrap_or(0);
        if usize::try_from(item.copies_out()).ok() != Some(count) {
            violations.push(InvariantViolation::CountMismatch {
                item: item.id(),
                copies_out: item.copies_out(),
                holders: count,
            });
        }
    }

    violations
}

// ============================================================================
// Ledger
// ============================================================================

/// Both stores plus the gateway that persists them.
#[derive(Debug)]
pub struct Ledger<G: PersistenceGateway> {
    items: ItemStore,
    borrowers: BorrowerStore,
    gateway: G,
}

impl<G: PersistenceGateway> Ledger<G> {
    /// Load the latest snapshot and rebuild both stores.
    ///
    /// # Errors
    ///
    /// Returns `CorruptSnapshot` if the snapshot cannot be read, repeats an
    /// identity, or violates the relationship invariant.
    pub fn open(gateway: G) -> Result<Self> {
        let snapshot = gateway.load()?;
        let (items, borrowers) = snapshot
            .into_stores()
            .map_err(|e| LendError::corrupt(gateway.location(), e.to_string()))?;

        let violations = check_relationships(&items, &borrowers);
        if let Some(first) = violations.first() {
            return Err(LendError::corrupt(
                gateway.location(),
                format!("{first} ({} violation(s) total)", violations.len()),
            ));
        }

        tracing::debug!(
            location = %gateway.location(),
            items = items.len(),
            borrowers = borrowers.len(),
            "ledger opened"
        );
        Ok(Self {
            items,
            borrowers,
            gateway,
        })
    }

    #[must_use]
    pub const fn items(&self) -> &ItemStore {
        &self.items
    }

    #[must_use]
    pub const fn borrowers(&self) -> &BorrowerStore {
        &self.borrowers
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Direct gateway access, e.g. to arm a failure in tests. Writing
    /// through it bypasses staging.
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Current state as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.items, &self.borrowers)
    }

    /// Run a mutation against staged copies, persist, then commit.
    ///
    /// The staged stores must still satisfy the relationship invariant, so
    /// nothing is saved that `open` would later refuse.
    ///
    /// # Errors
    ///
    /// Returns whatever `op` returns, `Validation` if the staged state
    /// breaks the invariant, or `PersistenceFailure` if the save fails.
    /// Live state is unchanged in every case.
    pub fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut ItemStore, &mut BorrowerStore) -> Result<T>,
    ) -> Result<T> {
        let mut items = self.items.clone();
        let mut borrowers = self.borrowers.clone();

        let out = op(&mut items, &mut borrowers)?;

        let violations = check_relationships(&items, &borrowers);
        if let Some(first) = violations.first() {
            tracing::debug!(%first, count = violations.len(), "mutation rejected");
            return Err(LendError::validation("relationships", first.to_string()));
        }

        self.gateway.save(&Snapshot::capture(&items, &borrowers))?;
        self.items = items;
        self.borrowers = borrowers;
        Ok(out)
    }

    /// Erase the persisted snapshot and start over with empty stores.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the gateway cannot clear or re-save.
    pub fn reset(&mut self) -> Result<()> {
        self.gateway.clear()?;
        self.items = ItemStore::new();
        self.borrowers = BorrowerStore::new();
        self.gateway.save(&Snapshot::empty())?;
        tracing::info!(location = %self.gateway.location(), "ledger reset");
        Ok(())
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Validate a draft, assign an identity, and add it to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `Validation` or `PersistenceFailure`.
    pub fn add_item(&mut self, draft: ItemDraft) -> Result<Item> {
        let item = self.apply(|items, _| items.create(draft, Utc::now()).cloned())?;
        tracing::info!(id = %item.id(), title = item.title(), copies = item.total_copies(), "item added");
        Ok(item)
    }

    /// Add an item that already carries an identity.
    ///
    /// Every copy must be on the shelf, since no borrower holds it yet.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity`, `Validation`, or `PersistenceFailure`.
    pub fn insert_item(&mut self, item: Item) -> Result<()> {
        let id = item.id();
        self.apply(|items, _| items.insert(item))?;
        tracing::info!(%id, "item inserted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound`, `HasOutstandingCopies`, or
    /// `PersistenceFailure`.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Item> {
        let item = self.apply(|items, _| items.remove(id))?;
        tracing::info!(%id, "item removed");
        Ok(item)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// # Errors
    ///
    /// Returns `Validation` or `PersistenceFailure`.
    pub fn add_borrower(&mut self, draft: BorrowerDraft) -> Result<Borrower> {
        let borrower = self.apply(|_, borrowers| borrowers.create(draft, Utc::now()).cloned())?;
        tracing::info!(id = %borrower.id(), name = borrower.name(), "borrower registered");
        Ok(borrower)
    }

    /// Register a borrower that already carries an identity. Every held
    /// item must exist and account for one of its copies out.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity`, `Validation`, or `PersistenceFailure`.
    pub fn insert_borrower(&mut self, borrower: Borrower) -> Result<()> {
        let id = borrower.id();
        self.apply(|_, borrowers| borrowers.insert(borrower))?;
        tracing::info!(%id, "borrower inserted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BorrowerNotFound`, `HasOutstandingHoldings`, or
    /// `PersistenceFailure`.
    pub fn remove_borrower(&mut self, id: BorrowerId) -> Result<Borrower> {
        let borrower = self.apply(|_, borrowers| borrowers.remove(id))?;
        tracing::info!(%id, "borrower removed");
        Ok(borrower)
    }
}

//! Issue/return state machine.
//!
//! Each (item, borrower) pair is either Available or Held. `issue` moves
//! Available to Held and `return_item` moves it back. All checks run
//! against the live state before anything is staged, and both sub-steps
//! land in the same snapshot write.

use crate::error::{LendError, Result};
use crate::ledger::{InvariantViolation, Ledger, check_relationships};
use crate::model::{Borrower, BorrowerId, Item, ItemId};
use crate::snapshot::PersistenceGateway;

/// Drives lending on top of a [`Ledger`].
#[derive(Debug)]
pub struct LendingCoordinator<G: PersistenceGateway> {
    ledger: Ledger<G>,
}

impl<G: PersistenceGateway> LendingCoordinator<G> {
    #[must_use]
    pub const fn new(ledger: Ledger<G>) -> Self {
        Self { ledger }
    }

    /// Open the ledger behind `gateway`.
    ///
    /// # Errors
    ///
    /// See [`Ledger::open`].
    pub fn open(gateway: G) -> Result<Self> {
        Ledger::open(gateway).map(Self::new)
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger<G> {
        &self.ledger
    }

    /// Catalog and registration changes go through the ledger directly.
    pub fn ledger_mut(&mut self) -> &mut Ledger<G> {
        &mut self.ledger
    }

    #[must_use]
    pub fn into_ledger(self) -> Ledger<G> {
        self.ledger
    }

    /// Explain why `issue` would fail, without changing anything.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound`, `BorrowerNotFound`, `ItemUnavailable`, or
    /// `AlreadyHeld`, checked in that order.
    pub fn check_issue(&self, item_id: ItemId, borrower_id: BorrowerId) -> Result<()> {
        let item = self.ledger.items().get(item_id)?;
        let borrower = self.ledger.borrowers().get(borrower_id)?;
        if !item.is_available() {
            return Err(LendError::ItemUnavailable { id: item_id });
        }
        if borrower.holds(item_id) {
            return Err(LendError::AlreadyHeld {
                borrower: borrower_id,
                item: item_id,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn can_issue(&self, item_id: ItemId, borrower_id: BorrowerId) -> bool {
        self.check_issue(item_id, borrower_id).is_ok()
    }

    /// Lend one copy of `item_id` to `borrower_id`.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::check_issue`], or `PersistenceFailure`. No
    /// state changes on error.
    pub fn issue(&mut self, item_id: ItemId, borrower_id: BorrowerId) -> Result<(Item, Borrower)> {
        if let Err(e) = self.check_issue(item_id, borrower_id) {
            tracing::debug!(item = %item_id, borrower = %borrower_id, error = %e, "issue rejected");
            return Err(e);
        }

        let (item, borrower) = self.ledger.apply(|items, borrowers| {
            let item = items.decrement_available(item_id)?.clone();
            let borrower = borrowers.add_held(borrower_id, item_id)?.clone();
            Ok((item, borrower))
        })?;

        tracing::info!(
            item = %item_id,
            borrower = %borrower_id,
            available = item.available_copies(),
            "issued"
        );
        Ok((item, borrower))
    }

    /// Take back a copy of `item_id` from `borrower_id`.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound`, `BorrowerNotFound`, `NotHeldByBorrower`, or
    /// `PersistenceFailure`. No state changes on error.
    pub fn return_item(
        &mut self,
        item_id: ItemId,
        borrower_id: BorrowerId,
    ) -> Result<(Item, Borrower)> {
        if let Err(e) = self.check_return(item_id, borrower_id) {
            tracing::debug!(item = %item_id, borrower = %borrower_id, error = %e, "return rejected");
            return Err(e);
        }

        let (item, borrower) = self.ledger.apply(|items, borrowers| {
            let borrower = borrowers.remove_held(borrower_id, item_id)?.clone();
            let item = items.increment_available(item_id)?.clone();
            Ok((item, borrower))
        })?;

        tracing::info!(
            item = %item_id,
            borrower = %borrower_id,
            available = item.available_copies(),
            "returned"
        );
        Ok((item, borrower))
    }

    fn check_return(&self, item_id: ItemId, borrower_id: BorrowerId) -> Result<()> {
        self.ledger.items().get(item_id)?;
        let borrower = self.ledger.borrowers().get(borrower_id)?;
        if !borrower.holds(item_id) {
            return Err(LendError::NotHeldByBorrower {
                borrower: borrower_id,
                item: item_id,
            });
        }
        Ok(())
    }

    /// Items a borrower currently holds, in identity order.
    ///
    /// # Errors
    ///
    /// Returns `BorrowerNotFound` if the borrower doesn't exist.
    pub fn held_items(&self, borrower_id: BorrowerId) -> Result<Vec<&Item>> {
        let borrower = self.ledger.borrowers().get(borrower_id)?;
        let mut held = Vec::with_capacity(borrower.held().len());
        for &item_id in borrower.held() {
            match self.ledger.items().get(item_id) {
                Ok(item) => held.push(item),
                Err(_) => {
                    tracing::warn!(borrower = %borrower_id, item = %item_id, "skipping unknown held item");
                }
            }
        }
        Ok(held)
    }

    /// Borrowers currently holding `item_id`, in identity order.
    #[must_use]
    pub fn holders_of(&self, item_id: ItemId) -> Vec<&Borrower> {
        self.ledger
            .borrowers()
            .iter()
            .filter(|b| b.holds(item_id))
            .collect()
    }

    /// Re-check the relationship invariant over the live state.
    #[must_use]
    pub fn verify(&self) -> Vec<InvariantViolation> {
        check_relationships(self.ledger.items(), self.ledger.borrowers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BorrowerDraft, ItemDraft};
    use crate::snapshot::{JsonlGateway, MemoryGateway};
    use proptest::prelude::*;

    struct Fixture {
        lending: LendingCoordinator<MemoryGateway>,
        item: ItemId,
        a: BorrowerId,
        b: BorrowerId,
        c: BorrowerId,
    }

    fn fixture(copies: u32) -> Fixture {
        let mut lending = LendingCoordinator::open(MemoryGateway::new()).unwrap();
        let ledger = lending.ledger_mut();
        let item = ledger
            .add_item(ItemDraft::new("Dune", "Frank Herbert", copies))
            .unwrap()
            .id();
        let a = ledger.add_borrower(BorrowerDraft::new("Ada", "")).unwrap().id();
        let b = ledger.add_borrower(BorrowerDraft::new("Brian", "")).unwrap().id();
        let c = ledger.add_borrower(BorrowerDraft::new("Cleo", "")).unwrap().id();
        Fixture {
            lending,
            item,
            a,
            b,
            c,
        }
    }

    fn available(f: &Fixture) -> u32 {
        f.lending.ledger().items().get(f.item).unwrap().available_copies()
    }

    #[test]
    fn test_issue_until_unavailable() {
        let mut f = fixture(2);

        let (item, borrower) = f.lending.issue(f.item, f.a).unwrap();
        assert_eq!(item.available_copies(), 1);
        assert!(borrower.holds(f.item));

        let (item, _) = f.lending.issue(f.item, f.b).unwrap();
        assert_eq!(item.available_copies(), 0);
        assert!(!item.is_available());

        let err = f.lending.issue(f.item, f.c).unwrap_err();
        assert!(matches!(err, LendError::ItemUnavailable { .. }));
        assert_eq!(available(&f), 0);
        assert!(f.lending.verify().is_empty());
    }

    #[test]
    fn test_issue_twice_is_rejected_once() {
        let mut f = fixture(3);
        f.lending.issue(f.item, f.a).unwrap();
        let saves = f.lending.ledger().gateway().saves();

        let err = f.lending.issue(f.item, f.a).unwrap_err();
        assert!(matches!(err, LendError::AlreadyHeld { .. }));
        assert_eq!(available(&f), 2);
        assert_eq!(f.lending.ledger().gateway().saves(), saves);
    }

    #[test]
    fn test_issue_resolves_item_before_borrower() {
        let mut f = fixture(1);
        let err = f.lending.issue(ItemId(99), BorrowerId(99)).unwrap_err();
        assert!(matches!(err, LendError::ItemNotFound { .. }));

        let err = f.lending.issue(f.item, BorrowerId(99)).unwrap_err();
        assert!(matches!(err, LendError::BorrowerNotFound { .. }));
    }

    #[test]
    fn test_return_not_held_changes_nothing() {
        let mut f = fixture(2);
        f.lending.issue(f.item, f.a).unwrap();
        let before = f.lending.ledger().snapshot();

        let err = f.lending.return_item(f.item, f.b).unwrap_err();
        assert!(matches!(
            err,
            LendError::NotHeldByBorrower { borrower, item } if borrower == f.b && item == f.item
        ));
        assert_eq!(f.lending.ledger().snapshot(), before);
    }

    #[test]
    fn test_issue_then_return_restores_counts() {
        let mut f = fixture(1);
        f.lending.issue(f.item, f.a).unwrap();
        let (item, borrower) = f.lending.return_item(f.item, f.a).unwrap();
        assert_eq!(item.available_copies(), 1);
        assert!(item.is_available());
        assert!(borrower.held().is_empty());

        let err = f.lending.return_item(f.item, f.a).unwrap_err();
        assert!(matches!(err, LendError::NotHeldByBorrower { .. }));
    }

    #[test]
    fn test_borrower_removal_waits_for_returns() {
        let mut f = fixture(2);
        let emma = f
            .lending
            .ledger_mut()
            .add_item(ItemDraft::new("Emma", "Jane Austen", 1))
            .unwrap()
            .id();
        f.lending.issue(f.item, f.a).unwrap();
        f.lending.issue(emma, f.a).unwrap();

        let err = f.lending.ledger_mut().remove_borrower(f.a).unwrap_err();
        assert!(matches!(err, LendError::HasOutstandingHoldings { count: 2, .. }));

        f.lending.return_item(f.item, f.a).unwrap();
        f.lending.return_item(emma, f.a).unwrap();
        f.lending.ledger_mut().remove_borrower(f.a).unwrap();
        assert!(!f.lending.ledger().borrowers().contains(f.a));
    }

    #[test]
    fn test_item_removal_waits_for_returns() {
        let mut f = fixture(1);
        f.lending.issue(f.item, f.a).unwrap();
        let err = f.lending.ledger_mut().remove_item(f.item).unwrap_err();
        assert!(matches!(err, LendError::HasOutstandingCopies { outstanding: 1, .. }));
    }

    #[test]
    fn test_can_issue_mirrors_issue() {
        let mut f = fixture(1);
        assert!(f.lending.can_issue(f.item, f.a));
        assert!(!f.lending.can_issue(ItemId(42), f.a));
        assert!(!f.lending.can_issue(f.item, BorrowerId(42)));

        f.lending.issue(f.item, f.a).unwrap();
        assert!(!f.lending.can_issue(f.item, f.a));
        assert!(!f.lending.can_issue(f.item, f.b));
        assert!(matches!(
            f.lending.check_issue(f.item, f.a),
            Err(LendError::ItemUnavailable { .. })
        ));
    }

    #[test]
    fn test_failed_save_rolls_back_issue() {
        let mut f = fixture(2);
        let before = f.lending.ledger().snapshot();

        f.lending.ledger_mut().gateway_mut().fail_next_save();
        let err = f.lending.issue(f.item, f.a).unwrap_err();
        assert!(matches!(err, LendError::PersistenceFailure { .. }));
        assert_eq!(f.lending.ledger().snapshot(), before);
        assert!(f.lending.can_issue(f.item, f.a));

        let reopened = LendingCoordinator::open(f.lending.into_ledger().gateway().clone()).unwrap();
        assert_eq!(reopened.ledger().snapshot(), before);
    }

    #[test]
    fn test_held_items_and_holders() {
        let mut f = fixture(2);
        f.lending.issue(f.item, f.a).unwrap();
        f.lending.issue(f.item, f.b).unwrap();

        let held = f.lending.held_items(f.a).unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].title(), "Dune");
        assert!(f.lending.held_items(f.c).unwrap().is_empty());
        assert!(f.lending.held_items(BorrowerId(77)).unwrap_err().is_not_found());

        let holders: Vec<BorrowerId> = f.lending.holders_of(f.item).iter().map(|b| b.id()).collect();
        assert_eq!(holders, vec![f.a, f.b]);
    }

    #[test]
    fn test_lending_survives_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let (item, ada) = {
            let mut lending = LendingCoordinator::open(JsonlGateway::new(&path)).unwrap();
            let item = lending
                .ledger_mut()
                .add_item(ItemDraft::new("Dune", "Herbert", 1))
                .unwrap()
                .id();
            let ada = lending
                .ledger_mut()
                .add_borrower(BorrowerDraft::new("Ada", ""))
                .unwrap()
                .id();
            lending.issue(item, ada).unwrap();
            (item, ada)
        };

        let mut lending = LendingCoordinator::open(JsonlGateway::new(&path)).unwrap();
        assert!(lending.ledger().borrowers().get(ada).unwrap().holds(item));
        assert_eq!(lending.ledger().items().get(item).unwrap().available_copies(), 0);
        lending.return_item(item, ada).unwrap();
        assert!(lending.verify().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Issue(usize, usize),
        Return(usize, usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize, 0..4usize).prop_map(|(i, b)| Op::Issue(i, b)),
            (0..3usize, 0..4usize).prop_map(|(i, b)| Op::Return(i, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_invariants_hold_after_any_sequence(
            copies in proptest::collection::vec(1u32..4, 3),
            ops in proptest::collection::vec(op_strategy(), 0..60),
        ) {
            let mut lending = LendingCoordinator::open(MemoryGateway::new()).unwrap();
            let items: Vec<ItemId> = copies
                .iter()
                .enumerate()
                .map(|(n, &c)| {
                    lending
                        .ledger_mut()
                        .add_item(ItemDraft::new(format!("Title {n}"), "Author", c))
                        .unwrap()
                        .id()
                })
                .collect();
            let borrowers: Vec<BorrowerId> = (0..4)
                .map(|n| {
                    lending
                        .ledger_mut()
                        .add_borrower(BorrowerDraft::new(format!("Borrower {n}"), ""))
                        .unwrap()
                        .id()
                })
                .collect();

            for op in ops {
                let _ = match op {
                    Op::Issue(i, b) => lending.issue(items[i], borrowers[b]),
                    Op::Return(i, b) => lending.return_item(items[i], borrowers[b]),
                };
                for item in lending.ledger().items().iter() {
                    prop_assert!(item.available_copies() <= item.total_copies());
                }
                prop_assert!(lending.verify().is_empty());
            }

            let reloaded = LendingCoordinator::open(lending.ledger().gateway().clone()).unwrap();
            prop_assert_eq!(reloaded.ledger().snapshot(), lending.ledger().snapshot());
        }
    }
}

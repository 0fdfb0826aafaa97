//! Read-only search and reporting over the stores.

use serde::Serialize;

use crate::borrower_store::BorrowerStore;
use crate::item_store::ItemStore;
use crate::model::{Borrower, Item};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Item search. Every set field must match; text matches are
/// case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct ItemFilters {
    pub title: Option<String>,
    pub author: Option<String>,
    pub available_only: bool,
}

impl ItemFilters {
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(ref title) = self.title {
            if !contains_ci(item.title(), title) {
                return false;
            }
        }
        if let Some(ref author) = self.author {
            if !contains_ci(item.author(), author) {
                return false;
            }
        }
        !self.available_only || item.is_available()
    }

    /// Matching items in identity order.
    #[must_use]
    pub fn apply<'a>(&self, store: &'a ItemStore) -> Vec<&'a Item> {
        store.iter().filter(|item| self.matches(item)).collect()
    }
}

/// Borrower search.
#[derive(Debug, Clone, Default)]
pub struct BorrowerFilters {
    pub name: Option<String>,
    pub holding_only: bool,
}

impl BorrowerFilters {
    #[must_use]
    pub fn matches(&self, borrower: &Borrower) -> bool {
        if let Some(ref name) = self.name {
            if !contains_ci(borrower.name(), name) {
                return false;
            }
        }
        !self.holding_only || !borrower.held().is_empty()
    }

    #[must_use]
    pub fn apply<'a>(&self, store: &'a BorrowerStore) -> Vec<&'a Borrower> {
        store.iter().filter(|b| self.matches(b)).collect()
    }
}

/// Aggregate counts for `lk stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub titles: usize,
    pub total_copies: u64,
    pub available_copies: u64,
    pub copies_on_loan: u64,
    pub titles_available: usize,
    pub borrowers: usize,
    pub borrowers_holding: usize,
}

impl Statistics {
    #[must_use]
    pub fn collect(items: &ItemStore, borrowers: &BorrowerStore) -> Self {
        let mut stats = Self {
            titles: items.len(),
            borrowers: borrowers.len(),
            ..Self::default()
        };
        for item in items.iter() {
            stats.total_copies += u64::from(item.total_copies());
            stats.available_copies += u64::from(item.available_copies());
            if item.is_available() {
                stats.titles_available += 1;
            }
        }
        stats.copies_on_loan = stats.total_copies - stats.available_copies;
        stats.borrowers_holding = borrowers.iter().filter(|b| !b.held().is_empty()).count();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BorrowerDraft, ItemDraft};
    use chrono::Utc;

    fn stores() -> (ItemStore, BorrowerStore) {
        let now = Utc::now();
        let mut items = ItemStore::new();
        let dune = items
            .create(ItemDraft::new("Dune", "Frank Herbert", 1), now)
            .unwrap()
            .id();
        items
            .create(ItemDraft::new("Dune Messiah", "Frank Herbert", 2), now)
            .unwrap();
        items
            .create(ItemDraft::new("Emma", "Jane Austen", 3), now)
            .unwrap();

        let mut borrowers = BorrowerStore::new();
        let ada = borrowers
            .create(BorrowerDraft::new("Ada Lovelace", ""), now)
            .unwrap()
            .id();
        borrowers
            .create(BorrowerDraft::new("Grace Hopper", ""), now)
            .unwrap();

        items.decrement_available(dune).unwrap();
        borrowers.add_held(ada, dune).unwrap();
        (items, borrowers)
    }

    #[test]
    fn test_item_filters() {
        let (items, _) = stores();

        let by_title = ItemFilters {
            title: Some("dune".to_string()),
            ..ItemFilters::default()
        };
        assert_eq!(by_title.apply(&items).len(), 2);

        let available_dune = ItemFilters {
            title: Some("DUNE".to_string()),
            available_only: true,
            ..ItemFilters::default()
        };
        let hits = available_dune.apply(&items);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title(), "Dune Messiah");

        let by_author = ItemFilters {
            author: Some("austen".to_string()),
            ..ItemFilters::default()
        };
        assert_eq!(by_author.apply(&items)[0].title(), "Emma");
    }

    #[test]
    fn test_borrower_filters() {
        let (_, borrowers) = stores();
        assert_eq!(BorrowerFilters::default().apply(&borrowers).len(), 2);

        let holding = BorrowerFilters {
            holding_only: true,
            ..BorrowerFilters::default()
        };
        assert_eq!(holding.apply(&borrowers)[0].name(), "Ada Lovelace");

        let by_name = BorrowerFilters {
            name: Some("hop".to_string()),
            ..BorrowerFilters::default()
        };
        assert_eq!(by_name.apply(&borrowers)[0].name(), "Grace Hopper");
    }

    #[test]
    fn test_statistics() {
        let (items, borrowers) = stores();
        let stats = Statistics::collect(&items, &borrowers);
        assert_eq!(
            stats,
            Statistics {
                titles: 3,
                total_copies: 6,
                available_copies: 5,
                copies_on_loan: 1,
                titles_available: 2,
                borrowers: 2,
                borrowers_holding: 1,
            }
        );
    }
}

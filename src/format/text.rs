//! Plain text formatting for terminal output.

use lendkeep_lib::{Borrower, Item, Statistics};

/// Format availability as `available/total`.
#[must_use]
pub fn format_availability(item: &Item) -> String {
    format!("{}/{}", item.available_copies(), item.total_copies())
}

/// Format a single-line item summary.
///
/// Format: `{id} [{available}/{total}] {title} by {author}`
#[must_use]
pub fn format_item_line(item: &Item) -> String {
    format!(
        "{} [{}] {} by {}",
        item.id(),
        format_availability(item),
        item.title(),
        item.author(),
    )
}

/// Format a single-line borrower summary.
#[must_use]
pub fn format_borrower_line(borrower: &Borrower) -> String {
    let held = borrower.held().len();
    let mut line = format!("{} {}", borrower.id(), borrower.name());
    if !borrower.contact().is_empty() {
        line.push_str(&format!(" <{}>", borrower.contact()));
    }
    if held > 0 {
        line.push_str(&format!(" ({held} held)"));
    }
    line
}

/// Multi-line statistics block.
#[must_use]
pub fn format_statistics(stats: &Statistics) -> String {
    format!(
        "Titles:            {}\n\
         Total copies:      {}\n\
         Available copies:  {}\n\
         Copies on loan:    {}\n\
         Titles available:  {}\n\
         Borrowers:         {}\n\
         Borrowers holding: {}",
        stats.titles,
        stats.total_copies,
        stats.available_copies,
        stats.copies_on_loan,
        stats.titles_available,
        stats.borrowers,
        stats.borrowers_holding,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lendkeep_lib::{BorrowerDraft, ItemDraft, LendingCoordinator, MemoryGateway};

    fn lending() -> LendingCoordinator<MemoryGateway> {
        let mut lending = LendingCoordinator::open(MemoryGateway::new()).unwrap();
        let ledger = lending.ledger_mut();
        ledger
            .add_item(ItemDraft::new("Dune", "Frank Herbert", 2))
            .unwrap();
        ledger
            .add_borrower(BorrowerDraft::new("Ada Lovelace", "ada@example.org"))
            .unwrap();
        ledger
            .add_borrower(BorrowerDraft::new("Grace Hopper", ""))
            .unwrap();
        lending
    }

    #[test]
    fn test_format_item_line() {
        let mut lending = lending();
        let item = lending.ledger().items().iter().next().unwrap().clone();
        insta::assert_snapshot!(format_item_line(&item), @"I-1 [2/2] Dune by Frank Herbert");

        let borrower = lending.ledger().borrowers().iter().next().unwrap().id();
        let (item, _) = lending.issue(item.id(), borrower).unwrap();
        assert_eq!(format_availability(&item), "1/2");
    }

    #[test]
    fn test_format_borrower_line() {
        let mut lending = lending();
        let grace = lending.ledger().borrowers().iter().nth(1).unwrap().clone();
        insta::assert_snapshot!(format_borrower_line(&grace), @"M-2 Grace Hopper");

        let item = lending.ledger().items().iter().next().unwrap().id();
        let ada = lending.ledger().borrowers().iter().next().unwrap().id();
        let (_, ada) = lending.issue(item, ada).unwrap();
        insta::assert_snapshot!(
            format_borrower_line(&ada),
            @"M-1 Ada Lovelace <ada@example.org> (1 held)"
        );
    }

    #[test]
    fn test_format_statistics() {
        let lending = lending();
        let stats = Statistics::collect(lending.ledger().items(), lending.ledger().borrowers());
        insta::assert_snapshot!(format_statistics(&stats), @r"
        Titles:            1
        Total copies:      2
        Available copies:  2
        Copies on loan:    0
        Titles available:  1
        Borrowers:         2
        Borrowers holding: 0
        ");
    }

    #[test]
    fn test_format_item_line_single_copy() {
        let item = lendkeep_lib::Item::new(
            lendkeep_lib::ItemId(9),
            ItemDraft::new("Emma", "Jane Austen", 1),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(format_item_line(&item), "I-9 [1/1] Emma by Jane Austen");
    }
}

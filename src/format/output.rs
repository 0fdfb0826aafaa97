use lendkeep_lib::{Borrower, BorrowerId, Item, ItemId};
use serde::Serialize;

use crate::error::Result;

/// Print a value as pretty JSON on stdout.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Borrower reference in item details.
#[derive(Debug, Clone, Serialize)]
pub struct HolderRef {
    pub id: BorrowerId,
    pub name: String,
}

/// Item with the borrowers currently holding it.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: Item,
    pub holders: Vec<HolderRef>,
}

/// Item reference in borrower details.
#[derive(Debug, Clone, Serialize)]
pub struct HeldItem {
    pub id: ItemId,
    pub title: String,
    pub author: String,
}

impl From<&Item> for HeldItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id(),
            title: item.title().to_string(),
            author: item.author().to_string(),
        }
    }
}

/// Borrower with held items resolved to titles.
#[derive(Debug, Clone, Serialize)]
pub struct BorrowerDetails {
    #[serde(flatten)]
    pub borrower: Borrower,
    pub held_items: Vec<HeldItem>,
}

/// Updated records after an issue or return.
#[derive(Debug, Clone, Serialize)]
pub struct LendingOutcome {
    pub action: &'static str,
    pub item: Item,
    pub borrower: Borrower,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanIssueOutcome {
    pub item: ItemId,
    pub borrower: BorrowerId,
    pub can_issue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

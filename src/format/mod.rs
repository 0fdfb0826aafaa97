//! Output formatting for `lendkeep`.
//!
//! Supports both human-readable text output and machine-parseable JSON.
//!
//! # JSON Output Types
//!
//! - [`ItemDetails`] - Item with its current holders (item show)
//! - [`BorrowerDetails`] - Borrower with resolved held items (borrower show)
//! - [`LendingOutcome`] - Result of issue/return
//! - [`CanIssueOutcome`] - Verdict of can-issue

mod output;
mod text;

pub use output::{
    BorrowerDetails, CanIssueOutcome, HeldItem, HolderRef, ItemDetails, LendingOutcome, print_json,
};
pub use text::{
    format_availability, format_borrower_line, format_item_line, format_statistics,
};

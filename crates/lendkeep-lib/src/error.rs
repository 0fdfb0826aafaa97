//! Error types for `lendkeep-lib`.
//!
//! Every variant is a local, recoverable condition. The caller decides
//! whether to retry, prompt, or abort.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{BorrowerId, ItemId};

/// Primary error type for lending ledger operations.
#[derive(Error, Debug)]
pub enum LendError {
    // === Identity Errors ===
    /// Item with the specified ID was not found.
    #[error("Item not found: {id}")]
    ItemNotFound { id: ItemId },

    /// Borrower with the specified ID was not found.
    #[error("Borrower not found: {id}")]
    BorrowerNotFound { id: BorrowerId },

    /// Attempted to insert an entity whose ID already exists.
    #[error("Duplicate {kind} ID: {id}")]
    DuplicateIdentity { kind: &'static str, id: u64 },

    // === Item Store Errors ===
    /// Store-level decrement on an item with zero available copies.
    #[error("No copies of item {id} are available")]
    NoCopiesAvailable { id: ItemId },

    /// Cannot remove an item while copies are out on loan.
    #[error("Cannot remove item {id}: {outstanding} copies are still held")]
    HasOutstandingCopies { id: ItemId, outstanding: u32 },

    // === Borrower Store Errors ===
    /// Store-level removal of an item ID the borrower does not hold.
    #[error("Borrower {borrower} does not hold item {item}")]
    NotHeld { borrower: BorrowerId, item: ItemId },

    /// Cannot remove a borrower who still holds items.
    #[error("Cannot remove borrower {id}: still holds {count} item(s)")]
    HasOutstandingHoldings { id: BorrowerId, count: usize },

    // === Lending Errors ===
    /// Issue rejected because every copy is already out.
    #[error("Item {id} is not available")]
    ItemUnavailable { id: ItemId },

    /// Issue rejected because the borrower already holds a copy.
    #[error("Borrower {borrower} already holds item {item}")]
    AlreadyHeld { borrower: BorrowerId, item: ItemId },

    /// Return rejected because the borrower never issued this item.
    #[error("Item {item} is not held by borrower {borrower}")]
    NotHeldByBorrower { borrower: BorrowerId, item: ItemId },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Persistence Errors ===
    /// A snapshot exists but cannot be trusted.
    #[error("Corrupt snapshot at {path}: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// The durable write failed; in-memory state was left unchanged.
    #[error("Persistence failure: {reason}")]
    PersistenceFailure {
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LendError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptSnapshot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn persistence(reason: impl Into<String>, source: Option<std::io::Error>) -> Self {
        Self::PersistenceFailure {
            reason: reason.into(),
            source,
        }
    }

    /// True for either flavour of unknown identity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ItemNotFound { .. } | Self::BorrowerNotFound { .. }
        )
    }

    /// Stable machine-readable code for JSON output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            Self::BorrowerNotFound { .. } => "BORROWER_NOT_FOUND",
            Self::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
            Self::NoCopiesAvailable { .. } => "NO_COPIES_AVAILABLE",
            Self::HasOutstandingCopies { .. } => "HAS_OUTSTANDING_COPIES",
            Self::NotHeld { .. } => "NOT_HELD",
            Self::HasOutstandingHoldings { .. } => "HAS_OUTSTANDING_HOLDINGS",
            Self::ItemUnavailable { .. } => "ITEM_UNAVAILABLE",
            Self::AlreadyHeld { .. } => "ALREADY_HELD",
            Self::NotHeldByBorrower { .. } => "NOT_HELD_BY_BORROWER",
            Self::Validation { .. } => "VALIDATION",
            Self::CorruptSnapshot { .. } => "CORRUPT_SNAPSHOT",
            Self::PersistenceFailure { .. } => "PERSISTENCE_FAILURE",
            Self::Json(_) => "JSON",
        }
    }
}

/// Result type using `LendError`.
pub type Result<T> = std::result::Result<T, LendError>;

//! `lendkeep-lib` — In-process lending ledger.
//!
//! Tracks a catalog of items with multiple copies, a registry of
//! borrowers, and the issue/return relationship between them. Every
//! mutation is written through to a JSONL snapshot before it becomes
//! visible.
//!
//! # Quick Start
//!
//! ```no_run
//! use lendkeep_lib::{BorrowerDraft, ItemDraft, JsonlGateway, LendingCoordinator};
//!
//! let mut lending = LendingCoordinator::open(JsonlGateway::new(".lendkeep/ledger.jsonl")).unwrap();
//!
//! let item = lending.ledger_mut().add_item(ItemDraft::new("Dune", "Frank Herbert", 2)).unwrap();
//! let ada = lending.ledger_mut().add_borrower(BorrowerDraft::new("Ada", "ada@example.org")).unwrap();
//!
//! lending.issue(item.id(), ada.id()).unwrap();
//! lending.return_item(item.id(), ada.id()).unwrap();
//! ```

pub mod borrower_store;
pub mod coordinator;
pub mod error;
pub mod item_store;
pub mod ledger;
pub mod model;
pub mod query;
pub mod snapshot;
pub mod util;

pub use borrower_store::BorrowerStore;
pub use coordinator::LendingCoordinator;
pub use error::{LendError, Result};
pub use item_store::ItemStore;
pub use ledger::{InvariantViolation, Ledger, check_relationships};
pub use model::{Borrower, BorrowerDraft, BorrowerId, Item, ItemDraft, ItemId};
pub use query::{BorrowerFilters, ItemFilters, Statistics};
pub use snapshot::{JsonlGateway, MemoryGateway, PersistenceGateway, Snapshot};

//! Command implementations.

pub mod borrower;
pub mod completions;
pub mod doctor;
pub mod init;
pub mod item;
pub mod lending;
pub mod stats;
pub mod version;

use lendkeep_lib::{JsonlGateway, LendingCoordinator};

use crate::config::Config;
use crate::error::Result;

/// Open the workspace ledger for a command.
///
/// # Errors
///
/// Returns `NotInitialized` if there is no workspace, or the library error
/// if the snapshot cannot be loaded.
pub fn open_lending(config: &Config) -> Result<LendingCoordinator<JsonlGateway>> {
    config.require_initialized()?;
    Ok(LendingCoordinator::open(JsonlGateway::new(
        &config.snapshot_file,
    ))?)
}

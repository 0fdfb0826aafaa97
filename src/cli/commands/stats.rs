use lendkeep_lib::Statistics;

use super::open_lending;
use crate::config::Config;
use crate::error::Result;
use crate::format::{format_statistics, print_json};

/// Execute the stats command.
///
/// # Errors
///
/// Returns an error if the ledger cannot be opened.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let lending = open_lending(config)?;
    let stats = Statistics::collect(lending.ledger().items(), lending.ledger().borrowers());

    if json {
        print_json(&stats)?;
    } else {
        println!("{}", format_statistics(&stats));
    }
    Ok(())
}

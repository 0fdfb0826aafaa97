//! Registration commands: add, remove, list, show.

use lendkeep_lib::{BorrowerDraft, BorrowerFilters, BorrowerId};

use super::open_lending;
use crate::cli::BorrowerSubcommand;
use crate::config::Config;
use crate::error::Result;
use crate::format::{BorrowerDetails, HeldItem, format_borrower_line, format_item_line, print_json};

/// Execute a borrower subcommand.
///
/// # Errors
///
/// Returns an error if the ledger cannot be opened or the operation is
/// rejected.
pub fn execute(command: BorrowerSubcommand, config: &Config, json: bool) -> Result<()> {
    match command {
        BorrowerSubcommand::Add { name, contact } => add(name, contact, config, json),
        BorrowerSubcommand::Remove { id } => remove(id, config, json),
        BorrowerSubcommand::List { name, holding } => list(name, holding, config, json),
        BorrowerSubcommand::Show { id } => show(id, config, json),
    }
}

fn add(name: String, contact: String, config: &Config, json: bool) -> Result<()> {
    let mut lending = open_lending(config)?;
    let borrower = lending
        .ledger_mut()
        .add_borrower(BorrowerDraft::new(name, contact))?;
    if json {
        print_json(&borrower)?;
    } else {
        println!("Registered {}", format_borrower_line(&borrower));
    }
    Ok(())
}

fn remove(id: BorrowerId, config: &Config, json: bool) -> Result<()> {
    let mut lending = open_lending(config)?;
    let borrower = lending.ledger_mut().remove_borrower(id)?;
    if json {
        print_json(&borrower)?;
    } else {
        println!("Removed {} {}", borrower.id(), borrower.name());
    }
    Ok(())
}

fn list(name: Option<String>, holding: bool, config: &Config, json: bool) -> Result<()> {
    let lending = open_lending(config)?;
    let filters = BorrowerFilters {
        name,
        holding_only: holding,
    };
    let borrowers = filters.apply(lending.ledger().borrowers());

    if json {
        print_json(&borrowers)?;
    } else if borrowers.is_empty() {
        println!("No borrowers found.");
    } else {
        for borrower in &borrowers {
            println!("{}", format_borrower_line(borrower));
        }
        println!("\n{} borrower(s)", borrowers.len());
    }
    Ok(())
}

fn show(id: BorrowerId, config: &Config, json: bool) -> Result<()> {
    let lending = open_lending(config)?;
    let borrower = lending.ledger().borrowers().get(id)?;
    let held = lending.held_items(id)?;

    if json {
        return print_json(&BorrowerDetails {
            borrower: borrower.clone(),
            held_items: held.into_iter().map(HeldItem::from).collect(),
        });
    }

    println!("{}", format_borrower_line(borrower));
    println!("Registered: {}", borrower.registered_at().format("%Y-%m-%d"));
    if held.is_empty() {
        println!("Holds nothing.");
    } else {
        println!("Holding:");
        for item in held {
            println!("  {}", format_item_line(item));
        }
    }
    Ok(())
}

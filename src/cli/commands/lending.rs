//! Issue, return, and can-issue.

use super::open_lending;
use crate::cli::LendArgs;
use crate::config::Config;
use crate::error::Result;
use crate::format::{CanIssueOutcome, LendingOutcome, format_availability, print_json};

/// Execute the issue command.
///
/// # Errors
///
/// Returns the rejection reason or a persistence error.
pub fn issue(args: LendArgs, config: &Config, json: bool) -> Result<()> {
    let mut lending = open_lending(config)?;
    let (item, borrower) = lending.issue(args.item, args.borrower)?;

    if json {
        print_json(&LendingOutcome {
            action: "issue",
            item,
            borrower,
        })?;
    } else {
        println!(
            "Issued {} \"{}\" to {} {} ({} available)",
            item.id(),
            item.title(),
            borrower.id(),
            borrower.name(),
            format_availability(&item)
        );
    }
    Ok(())
}

/// Execute the return command.
///
/// # Errors
///
/// Returns the rejection reason or a persistence error.
pub fn return_item(args: LendArgs, config: &Config, json: bool) -> Result<()> {
    let mut lending = open_lending(config)?;
    let (item, borrower) = lending.return_item(args.item, args.borrower)?;

    if json {
        print_json(&LendingOutcome {
            action: "return",
            item,
            borrower,
        })?;
    } else {
        println!(
            "Returned {} \"{}\" from {} {} ({} available)",
            item.id(),
            item.title(),
            borrower.id(),
            borrower.name(),
            format_availability(&item)
        );
    }
    Ok(())
}

/// Execute the can-issue command. Exits with status 1 when the issue would
/// be rejected.
///
/// # Errors
///
/// Returns an error if the ledger cannot be opened.
pub fn can_issue(args: LendArgs, config: &Config, json: bool) -> Result<()> {
    let lending = open_lending(config)?;
    let verdict = lending.check_issue(args.item, args.borrower);

    let outcome = CanIssueOutcome {
        item: args.item,
        borrower: args.borrower,
        can_issue: verdict.is_ok(),
        code: verdict.as_ref().err().map(lendkeep_lib::LendError::code),
        reason: verdict.as_ref().err().map(ToString::to_string),
    };

    if json {
        print_json(&outcome)?;
    } else if let Some(reason) = &outcome.reason {
        println!("no: {reason}");
    } else {
        println!("yes: {} can be issued to {}", args.item, args.borrower);
    }

    if !outcome.can_issue {
        std::process::exit(1);
    }
    Ok(())
}

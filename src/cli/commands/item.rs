//! Catalog commands: add, remove, list, show.

use lendkeep_lib::{ItemDraft, ItemFilters, ItemId};

use super::open_lending;
use crate::cli::{ItemAddArgs, ItemListArgs, ItemSubcommand};
use crate::config::Config;
use crate::error::Result;
use crate::format::{HolderRef, ItemDetails, format_item_line, print_json};

/// Execute an item subcommand.
///
/// # Errors
///
/// Returns an error if the ledger cannot be opened or the operation is
/// rejected.
pub fn execute(command: ItemSubcommand, config: &Config, json: bool) -> Result<()> {
    match command {
        ItemSubcommand::Add(args) => add(args, config, json),
        ItemSubcommand::Remove { id } => remove(id, config, json),
        ItemSubcommand::List(args) => list(&args, config, json),
        ItemSubcommand::Show { id } => show(id, config, json),
    }
}

fn add(args: ItemAddArgs, config: &Config, json: bool) -> Result<()> {
    let mut lending = open_lending(config)?;

    let mut draft = ItemDraft::new(
        args.title,
        args.author,
        args.copies.unwrap_or(config.default_copies),
    );
    if let Some(publisher) = args.publisher {
        draft = draft.with_publisher(publisher);
    }
    if let Some(code) = args.code {
        draft = draft.with_catalog_code(code);
    }

    let item = lending.ledger_mut().add_item(draft)?;
    if json {
        print_json(&item)?;
    } else {
        println!("Added {}", format_item_line(&item));
    }
    Ok(())
}

fn remove(id: ItemId, config: &Config, json: bool) -> Result<()> {
    let mut lending = open_lending(config)?;
    let item = lending.ledger_mut().remove_item(id)?;
    if json {
        print_json(&item)?;
    } else {
        println!("Removed {} {}", item.id(), item.title());
    }
    Ok(())
}

fn list(args: &ItemListArgs, config: &Config, json: bool) -> Result<()> {
    let lending = open_lending(config)?;
    let filters = ItemFilters {
        title: args.title.clone(),
        author: args.author.clone(),
        available_only: args.available,
    };
    let items = filters.apply(lending.ledger().items());

    if json {
        print_json(&items)?;
    } else if items.is_empty() {
        println!("No items found.");
    } else {
        for item in &items {
            println!("{}", format_item_line(item));
        }
        println!("\n{} item(s)", items.len());
    }
    Ok(())
}

fn show(id: ItemId, config: &Config, json: bool) -> Result<()> {
    let lending = open_lending(config)?;
    let item = lending.ledger().items().get(id)?;
    let holders: Vec<HolderRef> = lending
        .holders_of(id)
        .into_iter()
        .map(|b| HolderRef {
            id: b.id(),
            name: b.name().to_string(),
        })
        .collect();

    if json {
        return print_json(&ItemDetails {
            item: item.clone(),
            holders,
        });
    }

    println!("{}", format_item_line(item));
    if let Some(publisher) = item.publisher() {
        println!("Publisher: {publisher}");
    }
    if let Some(code) = item.catalog_code() {
        println!("Code:      {code}");
    }
    println!("Added:     {}", item.added_at().format("%Y-%m-%d"));
    if holders.is_empty() {
        println!("No copies on loan.");
    } else {
        println!("Held by:");
        for holder in &holders {
            println!("  {} {}", holder.id, holder.name);
        }
    }
    Ok(())
}

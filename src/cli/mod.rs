//! Command-line interface for `lendkeep`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use lendkeep_lib::{BorrowerId, ItemId};

use crate::config::{CliOverrides, Config};
use crate::error::code_for;
use crate::logging::{self, LogFormat};

/// `lendkeep` (lk) - Lending ledger for small collections.
#[derive(Parser, Debug)]
#[command(name = "lk")]
#[command(
    author,
    version,
    about = "Lending ledger for small collections (JSONL snapshots)",
    long_about = None,
    after_help = "Every change is written to .lendkeep/ledger.jsonl before it is reported."
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit log lines as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Workspace directory (default: .lendkeep)
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a lendkeep workspace
    Init(InitArgs),

    /// Manage catalog items
    Item(ItemCommand),

    /// Manage borrowers (alias: member)
    #[command(alias = "member")]
    Borrower(BorrowerCommand),

    /// Lend one copy of an item to a borrower
    Issue(LendArgs),

    /// Take back a copy of an item from a borrower
    Return(LendArgs),

    /// Check whether an item could be issued to a borrower
    CanIssue(LendArgs),

    /// Stats summary (alias: status)
    #[command(alias = "status")]
    Stats,

    /// Check the snapshot and ledger invariants
    Doctor,

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Wipe an existing workspace's ledger
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ItemCommand {
    /// Item subcommand
    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ItemSubcommand {
    /// Add an item to the catalog
    Add(ItemAddArgs),

    /// Remove an item (all copies must be returned)
    Remove {
        /// Item ID (e.g. I-3)
        id: ItemId,
    },

    /// List or search items
    List(ItemListArgs),

    /// Show item details and current holders
    Show {
        /// Item ID (e.g. I-3)
        id: ItemId,
    },
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
    /// Title
    pub title: String,

    /// Author
    #[arg(long, short = 'a')]
    pub author: String,

    /// Publisher
    #[arg(long)]
    pub publisher: Option<String>,

    /// Catalog code such as an ISBN
    #[arg(long)]
    pub code: Option<String>,

    /// Number of copies (default from config)
    #[arg(long, short = 'n')]
    pub copies: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub struct ItemListArgs {
    /// Title contains (case-insensitive)
    #[arg(long)]
    pub title: Option<String>,

    /// Author contains (case-insensitive)
    #[arg(long)]
    pub author: Option<String>,

    /// Only items with a copy on the shelf
    #[arg(long)]
    pub available: bool,
}

#[derive(Args, Debug)]
pub struct BorrowerCommand {
    /// Borrower subcommand
    #[command(subcommand)]
    pub command: BorrowerSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum BorrowerSubcommand {
    /// Register a borrower
    Add {
        /// Full name
        name: String,

        /// Email, phone, or any contact note
        #[arg(long, default_value = "")]
        contact: String,
    },

    /// Unregister a borrower (must hold nothing)
    Remove {
        /// Borrower ID (e.g. M-2)
        id: BorrowerId,
    },

    /// List or search borrowers
    List {
        /// Name contains (case-insensitive)
        #[arg(long)]
        name: Option<String>,

        /// Only borrowers currently holding items
        #[arg(long)]
        holding: bool,
    },

    /// Show borrower details and held items
    Show {
        /// Borrower ID (e.g. M-2)
        id: BorrowerId,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct LendArgs {
    /// Item ID (e.g. I-3)
    pub item: ItemId,

    /// Borrower ID (e.g. M-2)
    pub borrower: BorrowerId,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let log_format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logging::init_logging(cli.verbose, cli.quiet, log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let json = cli.json;
    let result = dispatch(cli);
    if let Err(err) = &result {
        if json {
            let body = serde_json::json!({
                "error": { "code": code_for(err), "message": err.to_string() }
            });
            println!("{body}");
        }
    }
    result
}

fn dispatch(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        println!("lk - Lending ledger. Use --help for usage.");
        return Ok(());
    };

    // Commands that don't touch the workspace.
    if matches!(command, Commands::Version) {
        commands::version::execute(cli.json)?;
        return Ok(());
    }
    if let Commands::Completions(args) = &command {
        commands::completions::execute(args.shell);
        return Ok(());
    }

    let config = Config::load(&CliOverrides { dir: cli.dir })?;
    tracing::debug!(command = command.name(), "dispatching");

    match command {
        Commands::Init(args) => commands::init::execute(&config, args.force, cli.json)?,
        Commands::Item(item) => commands::item::execute(item.command, &config, cli.json)?,
        Commands::Borrower(borrower) => {
            commands::borrower::execute(borrower.command, &config, cli.json)?;
        }
        Commands::Issue(args) => commands::lending::issue(args, &config, cli.json)?,
        Commands::Return(args) => commands::lending::return_item(args, &config, cli.json)?,
        Commands::CanIssue(args) => commands::lending::can_issue(args, &config, cli.json)?,
        Commands::Stats => commands::stats::execute(&config, cli.json)?,
        Commands::Doctor => commands::doctor::execute(&config, cli.json)?,
        Commands::Version | Commands::Completions(_) => {}
    }
    Ok(())
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Item(item) => match item.command {
                ItemSubcommand::Add(_) => "item add",
                ItemSubcommand::Remove { .. } => "item remove",
                ItemSubcommand::List(_) => "item list",
                ItemSubcommand::Show { .. } => "item show",
            },
            Self::Borrower(borrower) => match borrower.command {
                BorrowerSubcommand::Add { .. } => "borrower add",
                BorrowerSubcommand::Remove { .. } => "borrower remove",
                BorrowerSubcommand::List { .. } => "borrower list",
                BorrowerSubcommand::Show { .. } => "borrower show",
            },
            Self::Issue(_) => "issue",
            Self::Return(_) => "return",
            Self::CanIssue(_) => "can-issue",
            Self::Stats => "stats",
            Self::Doctor => "doctor",
            Self::Version => "version",
            Self::Completions(_) => "completions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_prefixed_and_bare_ids() {
        let cli = Cli::try_parse_from(["lk", "issue", "I-3", "2"]).unwrap();
        match cli.command {
            Some(Commands::Issue(args)) => {
                assert_eq!(args.item, ItemId(3));
                assert_eq!(args.borrower, BorrowerId(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_zero_id() {
        assert!(Cli::try_parse_from(["lk", "item", "show", "0"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lk", "stats", "--json", "-vv", "--dir", "/tmp/x"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/x")));
    }
}

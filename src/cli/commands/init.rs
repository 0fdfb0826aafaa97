use std::fs;

use lendkeep_lib::{JsonlGateway, PersistenceGateway, Snapshot};
use serde::Serialize;

use crate::config::{CONFIG_TEMPLATE, Config};
use crate::error::{CliError, Result};
use crate::format::print_json;

#[derive(Serialize)]
struct InitOutput {
    workspace: String,
    snapshot: String,
    reset: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if a snapshot exists and `force` is not
/// set, or an error if the directory or snapshot cannot be written.
pub fn execute(config: &Config, force: bool, json: bool) -> Result<()> {
    let data_dir = &config.data_dir;
    if !data_dir.exists() {
        fs::create_dir_all(data_dir)?;
    }

    let mut gateway = JsonlGateway::new(&config.snapshot_file);
    let reset = gateway.exists();
    if reset && !force {
        return Err(CliError::AlreadyInitialized {
            path: config.snapshot_file.clone(),
        });
    }

    // A corrupt snapshot must still be replaceable, so it is never loaded.
    if reset {
        gateway.clear()?;
    }
    gateway.save(&Snapshot::empty())?;
    tracing::info!(location = %gateway.location(), reset, "empty ledger written");

    let config_path = config.config_path();
    if !config_path.exists() {
        fs::write(&config_path, CONFIG_TEMPLATE)?;
    }

    let gitignore_path = data_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(gitignore_path, "# Interrupted snapshot writes\n*.tmp\n")?;
    }

    if json {
        print_json(&InitOutput {
            workspace: data_dir.display().to_string(),
            snapshot: config.snapshot_file.display().to_string(),
            reset,
        })?;
    } else if reset {
        println!("Reset lendkeep ledger in {}", data_dir.display());
    } else {
        println!("Initialized lendkeep workspace in {}", data_dir.display());
    }
    Ok(())
}

//! Version command implementation.

use serde::Serialize;

use crate::error::Result;
use crate::format::print_json;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    snapshot_format: u32,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };

    if json {
        return print_json(&VersionOutput {
            version,
            build,
            snapshot_format: lendkeep_lib::snapshot::FORMAT_VERSION,
        });
    }

    println!("lk version {version} ({build})");
    Ok(())
}

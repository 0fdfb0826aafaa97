use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::Cli;

/// Write completions for `shell` to stdout.
pub fn execute(shell: Shell) {
    let mut command = Cli::command();
    generate(shell, &mut command, "lk", &mut std::io::stdout());
}

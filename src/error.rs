//! Error types for the `lk` driver.

use std::path::PathBuf;

use lendkeep_lib::LendError;
use thiserror::Error;

/// Errors raised by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// No workspace at the resolved location.
    #[error("No lendkeep workspace at {path} (run `lk init`)")]
    NotInitialized { path: PathBuf },

    /// `lk init` without `--force` on an existing workspace.
    #[error("Workspace already initialized at {path} (use --force to reset)")]
    AlreadyInitialized { path: PathBuf },

    /// Invalid configuration value or file.
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Lend(#[from] LendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Stable machine-readable code for `--json` error output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized { .. } => "NOT_INITIALIZED",
            Self::AlreadyInitialized { .. } => "ALREADY_INITIALIZED",
            Self::Config(_) | Self::Yaml(_) => "CONFIG",
            Self::Lend(err) => err.code(),
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
        }
    }
}

/// Result type using `CliError`.
pub type Result<T> = std::result::Result<T, CliError>;

/// Pick an error code for anything that reached the top level.
#[must_use]
pub fn code_for(err: &anyhow::Error) -> &'static str {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.code();
    }
    if let Some(lend) = err.downcast_ref::<LendError>() {
        return lend.code();
    }
    "INTERNAL"
}

//! Configuration management for `lendkeep`.
//!
//! Values are resolved in layers, later layers winning:
//! - Built-in defaults
//! - Workspace config (`.lendkeep/config.yaml`)
//! - Environment (`LENDKEEP_DIR`, `LENDKEEP_SNAPSHOT`)
//! - Command-line overrides (`--dir`)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Default workspace directory name.
pub const WORKSPACE_DIR: &str = ".lendkeep";
/// Config file name inside the workspace.
pub const CONFIG_FILE: &str = "config.yaml";
/// Default snapshot file name inside the workspace.
pub const DEFAULT_SNAPSHOT: &str = "ledger.jsonl";

pub const ENV_DIR: &str = "LENDKEEP_DIR";
pub const ENV_SNAPSHOT: &str = "LENDKEEP_SNAPSHOT";

/// Template written by `lk init`.
pub const CONFIG_TEMPLATE: &str = r"# lendkeep workspace configuration
# snapshot_file: ledger.jsonl
# default_copies: 1
";

/// On-disk shape of `config.yaml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub snapshot_file: Option<String>,
    pub default_copies: Option<u32>,
}

/// Overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dir: Option<PathBuf>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub snapshot_file: PathBuf,
    pub default_copies: u32,
}

impl Config {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Config` or `Yaml` if `config.yaml` is unreadable or invalid.
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let env_dir = std::env::var_os(ENV_DIR).map(PathBuf::from);
        let env_snapshot = std::env::var(ENV_SNAPSHOT).ok();
        Self::resolve(overrides, env_dir, env_snapshot)
    }

    /// Resolve configuration with the environment passed in explicitly.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn resolve(
        overrides: &CliOverrides,
        env_dir: Option<PathBuf>,
        env_snapshot: Option<String>,
    ) -> Result<Self> {
        let data_dir = overrides
            .dir
            .clone()
            .or(env_dir)
            .unwrap_or_else(|| PathBuf::from(WORKSPACE_DIR));
        let data_dir = normalize(&data_dir);

        let file = read_config_file(&data_dir.join(CONFIG_FILE))?;

        let snapshot_name = env_snapshot
            .filter(|s| !s.trim().is_empty())
            .or(file.snapshot_file)
            .unwrap_or_else(|| DEFAULT_SNAPSHOT.to_string());
        let snapshot_file = {
            let candidate = PathBuf::from(snapshot_name.trim());
            if candidate.is_absolute() {
                candidate
            } else {
                data_dir.join(candidate)
            }
        };

        let default_copies = file.default_copies.unwrap_or(1);
        if default_copies == 0 {
            return Err(CliError::Config(
                "default_copies must be at least 1".to_string(),
            ));
        }

        tracing::debug!(
            data_dir = %data_dir.display(),
            snapshot = %snapshot_file.display(),
            "config resolved"
        );
        Ok(Self {
            data_dir,
            snapshot_file,
            default_copies,
        })
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// A workspace exists once `lk init` has written its config or snapshot.
    /// A bare directory does not count.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.data_dir.is_dir() && (self.config_path().is_file() || self.snapshot_file.is_file())
    }

    /// # Errors
    ///
    /// Returns `NotInitialized` if `lk init` has not run for this workspace.
    pub fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(CliError::NotInitialized {
                path: self.data_dir.clone(),
            })
        }
    }
}

/// Canonicalize existing paths without the Windows `\\?\` prefix.
fn normalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(ConfigFile::default()),
        Ok(text) => {
            let parsed: Option<ConfigFile> = serde_yaml::from_str(&text)?;
            Ok(parsed.unwrap_or_default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(CliError::Config(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}

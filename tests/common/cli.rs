//! Workspace harness for driving the `lk` binary.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitStatus;

use assert_cmd::Command;
use tempfile::TempDir;

/// A throwaway directory to run `lk` in.
pub struct LkWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl LkWorkspace {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(".lendkeep")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir().join("ledger.jsonl")
    }

    /// A configured `lk` command rooted in this workspace.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("lk").expect("lk binary");
        cmd.current_dir(&self.root)
            .env_remove("LENDKEEP_DIR")
            .env_remove("LENDKEEP_SNAPSHOT")
            .env_remove("RUST_LOG");
        cmd
    }
}

pub struct LkOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl LkOutput {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", self.stdout))
    }
}

/// Run `lk` with `args` and capture the result. `label` names the step in
/// failure messages.
pub fn run_lk<I, S>(workspace: &LkWorkspace, args: I, label: &str) -> LkOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = workspace
        .command()
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("{label}: failed to spawn lk: {e}"));
    LkOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Run `lk` and assert it succeeded.
pub fn run_lk_ok<I, S>(workspace: &LkWorkspace, args: I, label: &str) -> LkOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_lk(workspace, args, label);
    assert!(
        output.status.success(),
        "{label} failed\nstdout: {}\nstderr: {}",
        output.stdout,
        output.stderr
    );
    output
}

/// A workspace with `lk init` already run.
pub fn initialized_workspace() -> LkWorkspace {
    let workspace = LkWorkspace::new();
    run_lk_ok(&workspace, ["init"], "init");
    workspace
}

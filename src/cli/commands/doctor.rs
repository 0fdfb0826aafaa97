//! Doctor command implementation.

use std::fs;
use std::path::Path;

use lendkeep_lib::snapshot::decode_with_header;
use lendkeep_lib::{JsonlGateway, LendError, check_relationships};
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
struct DoctorReport {
    ok: bool,
    checks: Vec<CheckResult>,
}

fn push_check(
    checks: &mut Vec<CheckResult>,
    name: &str,
    status: CheckStatus,
    message: Option<String>,
    details: Option<serde_json::Value>,
) {
    checks.push(CheckResult {
        name: name.to_string(),
        status,
        message,
        details,
    });
}

fn has_error(checks: &[CheckResult]) -> bool {
    checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Error))
}

fn print_report(report: &DoctorReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!("lk doctor");
    for check in &report.checks {
        let label = match check.status {
            CheckStatus::Ok => "OK",
            CheckStatus::Warn => "WARN",
            CheckStatus::Error => "ERROR",
        };
        if let Some(message) = &check.message {
            println!("{label} {}: {}", check.name, message);
        } else {
            println!("{label} {}", check.name);
        }
    }
    Ok(())
}

/// Flag a leftover temp file from an interrupted save.
fn check_interrupted_save(snapshot: &Path, checks: &mut Vec<CheckResult>) {
    let tmp = JsonlGateway::new(snapshot).tmp_path();
    if tmp.exists() {
        push_check(
            checks,
            "snapshot.interrupted_write",
            CheckStatus::Warn,
            Some("Leftover temp file from an interrupted save".to_string()),
            Some(serde_json::json!({ "path": tmp.display().to_string() })),
        );
    } else {
        push_check(checks, "snapshot.interrupted_write", CheckStatus::Ok, None, None);
    }
}

/// Line-level JSON parse, independent of record structure.
fn check_lines(text: &str, path: &Path, checks: &mut Vec<CheckResult>) -> usize {
    let mut total = 0usize;
    let mut invalid = Vec::new();
    let mut invalid_count = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        total += 1;
        if serde_json::from_str::<serde_json::Value>(trimmed).is_err() {
            invalid_count += 1;
            if invalid.len() < 10 {
                invalid.push(idx + 1);
            }
        }
    }

    if invalid.is_empty() {
        push_check(
            checks,
            "snapshot.parse",
            CheckStatus::Ok,
            Some(format!("Parsed {total} lines")),
            Some(serde_json::json!({
                "path": path.display().to_string(),
                "lines": total
            })),
        );
    } else {
        push_check(
            checks,
            "snapshot.parse",
            CheckStatus::Error,
            Some(format!(
                "Malformed JSONL lines: {invalid_count} (first: {invalid:?})"
            )),
            Some(serde_json::json!({
                "path": path.display().to_string(),
                "lines": total,
                "invalid_lines": invalid,
                "invalid_count": invalid_count
            })),
        );
    }
    total
}

/// Structural decode plus the relationship invariant.
fn check_ledger(text: &str, path: &Path, checks: &mut Vec<CheckResult>) {
    let (header, snapshot) = match decode_with_header(text, path) {
        Ok(decoded) => decoded,
        Err(err) => {
            let reason = match err {
                LendError::CorruptSnapshot { reason, .. } => reason,
                other => other.to_string(),
            };
            push_check(checks, "snapshot.decode", CheckStatus::Error, Some(reason), None);
            return;
        }
    };

    push_check(
        checks,
        "snapshot.decode",
        CheckStatus::Ok,
        Some(format!(
            "{} items, {} borrowers (format v{}, saved {})",
            snapshot.items.len(),
            snapshot.borrowers.len(),
            header.version,
            header.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        Some(serde_json::json!({
            "items": snapshot.items.len(),
            "borrowers": snapshot.borrowers.len(),
            "next_item_id": header.next_item_id,
            "next_borrower_id": header.next_borrower_id,
        })),
    );

    let (items, borrowers) = match snapshot.into_stores() {
        Ok(stores) => stores,
        Err(err) => {
            push_check(
                checks,
                "ledger.identities",
                CheckStatus::Error,
                Some(err.to_string()),
                None,
            );
            return;
        }
    };

    let violations = check_relationships(&items, &borrowers);
    if violations.is_empty() {
        push_check(checks, "ledger.invariants", CheckStatus::Ok, None, None);
    } else {
        push_check(
            checks,
            "ledger.invariants",
            CheckStatus::Error,
            Some(format!(
                "{} violation(s); first: {}",
                violations.len(),
                violations[0]
            )),
            Some(serde_json::json!({ "violations": violations })),
        );
    }
}

fn collect_checks(config: &Config) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    if !config.data_dir.is_dir() {
        push_check(
            &mut checks,
            "workspace.dir",
            CheckStatus::Error,
            Some(format!(
                "Missing {} (run `lk init`)",
                config.data_dir.display()
            )),
            None,
        );
        return checks;
    }
    push_check(&mut checks, "workspace.dir", CheckStatus::Ok, None, None);

    let path = &config.snapshot_file;
    check_interrupted_save(path, &mut checks);

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            push_check(
                &mut checks,
                "snapshot.exists",
                CheckStatus::Warn,
                Some("No snapshot yet; the ledger is empty".to_string()),
                Some(serde_json::json!({ "path": path.display().to_string() })),
            );
            return checks;
        }
        Err(err) => {
            push_check(
                &mut checks,
                "snapshot.exists",
                CheckStatus::Error,
                Some(format!("Failed to read snapshot: {err}")),
                Some(serde_json::json!({ "path": path.display().to_string() })),
            );
            return checks;
        }
    };
    push_check(&mut checks, "snapshot.exists", CheckStatus::Ok, None, None);

    check_lines(&text, path, &mut checks);
    check_ledger(&text, path, &mut checks);
    checks
}

/// Execute the doctor command.
///
/// # Errors
///
/// Returns an error if report serialization fails.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let checks = collect_checks(config);
    let report = DoctorReport {
        ok: !has_error(&checks),
        checks,
    };
    print_report(&report, json)?;

    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}

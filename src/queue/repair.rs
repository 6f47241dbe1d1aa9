use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use super::store;

const BACKUP_DIR: &str = "backups";

/// What `repair_queue` found and did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepairOutcome {
    /// No queue file exists; nothing to do.
    NotFound,
    /// The file was well-formed and every entry points at an existing file.
    Healthy { entries: usize },
    /// The file was empty; it was backed up and reset to `[]`.
    ResetEmpty { backup: PathBuf },
    /// The file was not valid JSON; it was backed up and reset to `[]`.
    ResetCorrupt { backup: PathBuf, error: String },
    /// Entries whose files are gone were dropped; the cleaned queue was also
    /// copied to `backup`.
    Pruned {
        removed: usize,
        remaining: usize,
        backup: PathBuf,
    },
    /// Valid JSON, but not an array. Left untouched for manual inspection.
    Invalid { reason: String },
}

/// Inspect and fix `<upload_dir>/.file_queue.json`, keeping a timestamped
/// copy of whatever is replaced under `<upload_dir>/backups/`. Relative
/// entry paths are checked against `root`.
pub fn repair_queue(root: &Path, upload_dir: &Path) -> Result<RepairOutcome> {
    let queue_file = store::queue_path(upload_dir);
    let backup_dir = upload_dir.join(BACKUP_DIR);
    fs::create_dir_all(&backup_dir)
        .with_context(|| format!("failed to create {}", backup_dir.display()))?;

    if !queue_file.exists() {
        return Ok(RepairOutcome::NotFound);
    }

    let contents = fs::read_to_string(&queue_file)
        .with_context(|| format!("failed to read {}", queue_file.display()))?;

    if contents.trim().is_empty() {
        let backup = backup_path(&backup_dir, "empty");
        fs::copy(&queue_file, &backup)?;
        reset(&queue_file)?;
        tracing::warn!(backup = %backup.display(), "queue file was empty, reset");
        return Ok(RepairOutcome::ResetEmpty { backup });
    }

    let value: Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            let backup = backup_path(&backup_dir, "corrupted");
            fs::copy(&queue_file, &backup)?;
            reset(&queue_file)?;
            tracing::warn!(backup = %backup.display(), error = %e, "queue file was corrupt, reset");
            return Ok(RepairOutcome::ResetCorrupt {
                backup,
                error: e.to_string(),
            });
        }
    };

    let Value::Array(items) = value else {
        return Ok(RepairOutcome::Invalid {
            reason: format!("expected an array, found {}", json_kind(&value)),
        });
    };

    let total = items.len();
    let kept: Vec<Value> = items
        .into_iter()
        .filter(|item| target_exists(root, item))
        .collect();
    let removed = total - kept.len();
    if removed == 0 {
        return Ok(RepairOutcome::Healthy { entries: total });
    }

    let json = serde_json::to_string_pretty(&kept)?;
    let backup = backup_path(&backup_dir, "fixed");
    fs::write(&backup, &json)?;
    fs::write(&queue_file, &json)?;
    tracing::info!(removed, remaining = kept.len(), "pruned entries with missing files");

    Ok(RepairOutcome::Pruned {
        removed,
        remaining: kept.len(),
        backup,
    })
}

fn target_exists(root: &Path, item: &Value) -> bool {
    item.get("file_path")
        .and_then(Value::as_str)
        .is_some_and(|p| !p.is_empty() && root.join(p).exists())
}

fn reset(queue_file: &Path) -> Result<()> {
    fs::write(queue_file, "[]")
        .with_context(|| format!("failed to reset {}", queue_file.display()))
}

fn backup_path(backup_dir: &Path, label: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    backup_dir.join(format!("{label}_queue_{stamp}.json"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use super::types::FileEntry;

pub const QUEUE_FILE: &str = ".file_queue.json";

pub fn queue_path(upload_dir: &Path) -> PathBuf {
    upload_dir.join(QUEUE_FILE)
}

/// Parsed queue file. Array items that do not decode as a [`FileEntry`]
/// are kept verbatim in `unparsed` so a later write does not lose them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueueContents {
    pub entries: Vec<FileEntry>,
    pub unparsed: Vec<Value>,
}

/// Read the queue file, discarding anything that does not decode.
pub fn load(path: &Path) -> Vec<FileEntry> {
    read(path).entries
}

/// Read the queue file. Never fails: a missing, empty or non-array file
/// yields an empty queue, and corrupt JSON is moved aside to
/// `<file>.bak.<unix-seconds>` first.
pub fn read(path: &Path) -> QueueContents {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "queue file not found, starting empty");
            return QueueContents::default();
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read queue file");
            return QueueContents::default();
        }
    };

    if contents.trim().is_empty() {
        tracing::warn!(path = %path.display(), "queue file is empty");
        return QueueContents::default();
    }

    let value: Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "queue file is not valid JSON");
            back_up_corrupt(path);
            return QueueContents::default();
        }
    };

    let Value::Array(items) = value else {
        tracing::warn!(path = %path.display(), "queue file is not a JSON array");
        return QueueContents::default();
    };

    let mut parsed = QueueContents::default();
    for item in items {
        match serde_json::from_value::<FileEntry>(item.clone()) {
            Ok(entry) => parsed.entries.push(entry),
            Err(e) => {
                let file = item.get("file_path").and_then(Value::as_str).unwrap_or("?");
                tracing::warn!(file, error = %e, "keeping malformed queue entry untouched");
                parsed.unparsed.push(item);
            }
        }
    }
    parsed
}

/// Write the queue atomically through a `.tmp` sibling.
pub fn save(path: &Path, entries: &[FileEntry]) -> Result<()> {
    write(path, entries, &[])
}

/// Like [`save`], appending `unparsed` items after the entries.
pub fn write(path: &Path, entries: &[FileEntry], unparsed: &[Value]) -> Result<()> {
    let mut items = entries
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    items.extend_from_slice(unparsed);

    let tmp = path.with_file_name(format!("{QUEUE_FILE}.tmp"));
    let json = serde_json::to_string_pretty(&items)?;
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn back_up_corrupt(path: &Path) {
    let backup = PathBuf::from(format!(
        "{}.bak.{}",
        path.display(),
        chrono::Utc::now().timestamp()
    ));
    match fs::rename(path, &backup) {
        Ok(()) => tracing::info!(backup = %backup.display(), "moved corrupt queue file aside"),
        Err(e) => tracing::warn!(error = %e, "could not move corrupt queue file aside"),
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde_json::Value;

use super::store;
use super::types::{FileEntry, FileKind, QueueStats, iso_datetime};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Bounded, age-limited register of files in the upload directory.
///
/// Every mutation is persisted to `.file_queue.json` before returning.
#[derive(Debug)]
pub struct QueueManager {
    root: PathBuf,
    queue_file: PathBuf,
    max_queue_size: usize,
    max_file_age_hours: u64,
    entries: Mutex<Vec<FileEntry>>,
    unparsed: Vec<Value>,
}

impl QueueManager {
    /// Open the queue in `upload_dir`. Relative `file_path`s recorded in the
    /// queue are resolved against `root`, the directory the web app runs in.
    pub fn open(
        root: &Path,
        upload_dir: &Path,
        max_queue_size: usize,
        max_file_age_hours: u64,
    ) -> Result<Self> {
        fs::create_dir_all(upload_dir)
            .with_context(|| format!("failed to create {}", upload_dir.display()))?;
        let queue_file = store::queue_path(upload_dir);
        let contents = store::read(&queue_file);
        tracing::info!(
            dir = %upload_dir.display(),
            entries = contents.entries.len(),
            unparsed = contents.unparsed.len(),
            max_queue_size,
            max_file_age_hours,
            "queue opened"
        );
        Ok(Self {
            root: root.to_path_buf(),
            queue_file,
            max_queue_size,
            max_file_age_hours,
            entries: Mutex::new(contents.entries),
            unparsed: contents.unparsed,
        })
    }

    pub fn max_file_age(&self) -> Duration {
        Duration::from_secs(self.max_file_age_hours * 3600)
    }

    fn state(&self) -> MutexGuard<'_, Vec<FileEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &[FileEntry]) -> Result<()> {
        store::write(&self.queue_file, entries, &self.unparsed)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn delete(&self, path: &str) -> bool {
        delete_file(&self.resolve(Path::new(path)))
    }

    /// Register an existing file. Returns `None` if `path` does not exist.
    pub fn add_file(&self, path: &Path, file_id: &str, kind: FileKind) -> Result<Option<FileEntry>> {
        let mut entries = self.state();

        let meta = match fs::metadata(self.resolve(path)) {
            Ok(m) => m,
            Err(_) => {
                tracing::error!(path = %path.display(), "file does not exist");
                return Ok(None);
            }
        };

        let timestamp = now_secs();
        let entry = FileEntry {
            file_id: file_id.to_string(),
            file_path: path.to_string_lossy().into_owned(),
            file_name: file_name(&path.to_string_lossy()),
            file_size: meta.len(),
            timestamp,
            datetime: iso_datetime(timestamp),
            file_type: kind,
        };

        entries.push(entry.clone());
        self.persist(&entries)?;
        self.enforce_locked(&mut entries)?;

        tracing::info!(file = %entry.file_name, id = file_id, kind = %entry.file_type, "file queued");
        Ok(Some(entry))
    }

    /// Drop the entry for `path` and delete the file. `false` if untracked.
    pub fn remove_file(&self, path: &str) -> Result<bool> {
        let mut entries = self.state();
        if !entries.iter().any(|e| e.file_path == path) {
            return Ok(false);
        }
        entries.retain(|e| e.file_path != path);
        self.delete(path);
        self.persist(&entries)?;
        Ok(true)
    }

    /// Drop every entry with `file_id`, returning how many files were deleted.
    pub fn remove_by_id(&self, file_id: &str) -> Result<usize> {
        let mut entries = self.state();
        let (matching, kept): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|e| e.file_id == file_id);
        *entries = kept;

        if matching.is_empty() {
            tracing::info!(id = file_id, "no queued files with this id");
            return Ok(0);
        }

        let removed = matching.iter().filter(|e| self.delete(&e.file_path)).count();
        self.persist(&entries)?;
        tracing::info!(id = file_id, removed, "removed files by id");
        Ok(removed)
    }

    /// Delete entries older than the configured age limit.
    pub fn cleanup_old_files(&self) -> Result<usize> {
        let mut entries = self.state();
        if entries.is_empty() {
            return Ok(0);
        }

        let now = now_secs();
        let cutoff = now - self.max_file_age().as_secs_f64();
        if !entries.iter().any(|e| e.timestamp < cutoff) {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in entries.iter().filter(|e| e.timestamp < cutoff) {
            if self.delete(&entry.file_path) {
                let age_hours = format!("{:.1}", (now - entry.timestamp) / 3600.0);
                tracing::info!(file = %entry.file_name, %age_hours, "removed stale file");
                removed += 1;
            }
        }
        entries.retain(|e| e.timestamp >= cutoff);
        self.persist(&entries)?;

        if removed > 0 {
            tracing::info!(removed, "age cleanup finished");
        }
        Ok(removed)
    }

    /// Trim the oldest entries until the queue fits its capacity.
    pub fn enforce_queue_size(&self) -> Result<usize> {
        let mut entries = self.state();
        self.enforce_locked(&mut entries)
    }

    fn enforce_locked(&self, entries: &mut Vec<FileEntry>) -> Result<usize> {
        if entries.len() <= self.max_queue_size {
            return Ok(0);
        }

        entries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        let excess = entries.len() - self.max_queue_size;
        let removed = entries
            .drain(..excess)
            .filter(|e| self.delete(&e.file_path))
            .count();
        self.persist(entries)?;

        if removed > 0 {
            tracing::info!(removed, "queue trimmed to capacity");
        }
        Ok(removed)
    }

    pub fn stats(&self) -> QueueStats {
        let entries = self.state();
        let total_size: u64 = entries.iter().map(|e| e.file_size).sum();
        let oldest = entries.iter().map(|e| e.timestamp).min_by(f64::total_cmp);
        let newest = entries.iter().map(|e| e.timestamp).max_by(f64::total_cmp);

        let mut files_by_type = BTreeMap::new();
        for entry in entries.iter() {
            *files_by_type
                .entry(entry.file_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        QueueStats {
            total_files: entries.len(),
            total_size_mb: (total_size as f64 / BYTES_PER_MB * 100.0).round() / 100.0,
            max_queue_size: self.max_queue_size,
            max_file_age_hours: self.max_file_age_hours,
            oldest_file: oldest.map(iso_datetime),
            newest_file: newest.map(iso_datetime),
            files_by_type,
        }
    }

    /// Delete every tracked file and empty the queue.
    pub fn force_cleanup_all(&self) -> Result<usize> {
        let mut entries = self.state();
        let removed = entries.iter().filter(|e| self.delete(&e.file_path)).count();
        entries.clear();
        self.persist(&entries)?;
        tracing::info!(removed, "queue purged");
        Ok(removed)
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        self.state().clone()
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Remove `path` if present. `true` only when a file was actually deleted.
fn delete_file(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "deleted");
            true
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to delete");
            false
        }
    }
}

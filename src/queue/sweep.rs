use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use walkdir::WalkDir;

/// Delete regular files directly under `dir` whose modification time is older
/// than `max_age`. Dot-files (the queue file, its temp/backup siblings) and
/// subdirectories are left alone. Returns the deleted paths.
pub fn sweep_stale(dir: &Path, max_age: Duration) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let now = SystemTime::now();
    let mut removed = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for entry in walker.into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
            continue;
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                tracing::info!(file = %entry.file_name().to_string_lossy(), "removed old upload");
                removed.push(entry.into_path());
            }
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to remove old upload");
            }
        }
    }

    removed.sort();
    Ok(removed)
}

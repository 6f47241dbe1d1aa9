use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Served until the real frontend is copied into `static/`.
pub const PLACEHOLDER_HTML: &str = r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="utf-8">
    <title>Cross Stitch Pattern Generator</title>
</head>
<body>
    <h1>Генератор схем для вышивки</h1>
    <p>Приложение развёрнуто. Замените static/index.html на собранный интерфейс.</p>
</body>
</html>
"#;

const STATIC_DIR: &str = "static";
const INDEX_FILE: &str = "index.html";

/// What `prepare` changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceReport {
    pub created_dirs: Vec<String>,
    pub placeholder_written: bool,
}

/// Ensure the bind-mounted directories exist under `root` and seed
/// `static/index.html` if nothing is there yet. Existing content is never
/// overwritten.
pub fn prepare(root: &Path, dirs: &[String]) -> Result<WorkspaceReport> {
    let mut report = WorkspaceReport::default();

    for dir in dirs {
        let path = root.join(dir);
        if !path.is_dir() {
            fs::create_dir_all(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            tracing::info!(dir = %dir, "created directory");
            report.created_dirs.push(dir.clone());
        }
    }

    let static_dir = root.join(STATIC_DIR);
    fs::create_dir_all(&static_dir)
        .with_context(|| format!("failed to create {}", static_dir.display()))?;
    let index = static_dir.join(INDEX_FILE);
    if !index.exists() {
        fs::write(&index, PLACEHOLDER_HTML)
            .with_context(|| format!("failed to write {}", index.display()))?;
        tracing::info!(path = %index.display(), "wrote placeholder page");
        report.placeholder_written = true;
    }

    Ok(report)
}

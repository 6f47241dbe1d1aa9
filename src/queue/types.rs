use std::collections::BTreeMap;
use std::fmt;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// What role a tracked upload plays. Unknown strings are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileKind {
    Input,
    Pattern,
    Preview,
    Other(String),
}

impl FileKind {
    pub fn as_str(&self) -> &str {
        match self {
            FileKind::Input => "input",
            FileKind::Pattern => "pattern",
            FileKind::Preview => "preview",
            FileKind::Other(s) => s,
        }
    }
}

impl Default for FileKind {
    fn default() -> Self {
        FileKind::Other("unknown".to_string())
    }
}

impl From<String> for FileKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "input" => FileKind::Input,
            "pattern" => FileKind::Pattern,
            "preview" => FileKind::Preview,
            _ => FileKind::Other(value),
        }
    }
}

impl From<FileKind> for String {
    fn from(kind: FileKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::str::FromStr for FileKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FileKind::from(s.to_string()))
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of `.file_queue.json`, shared with the web app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_id: String,
    pub file_path: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    /// Seconds since the Unix epoch, fractional.
    pub timestamp: f64,
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub file_type: FileKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_files: usize,
    pub total_size_mb: f64,
    pub max_queue_size: usize,
    pub max_file_age_hours: u64,
    pub oldest_file: Option<String>,
    pub newest_file: Option<String>,
    pub files_by_type: BTreeMap<String, usize>,
}

/// Local naive ISO-8601 rendering of an epoch timestamp, e.g.
/// `2024-03-01T12:30:05.250000`. Whole seconds carry no fraction, matching
/// the web app's `isoformat()`.
pub fn iso_datetime(timestamp: f64) -> String {
    let mut secs = timestamp.floor() as i64;
    let mut micros = ((timestamp - timestamp.floor()) * 1e6).round() as u32;
    if micros >= 1_000_000 {
        secs += 1;
        micros = 0;
    }
    let Some(dt) = Local.timestamp_opt(secs, micros * 1000).single() else {
        return String::new();
    };
    let base = dt.naive_local().format("%Y-%m-%dT%H:%M:%S");
    if micros == 0 {
        base.to_string()
    } else {
        format!("{base}.{micros:06}")
    }
}

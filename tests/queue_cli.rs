use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use serde_json::{Value, json};

fn cmd(project: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("stitchctl");
    cmd.env_remove("RUST_LOG").arg("--dir").arg(project);
    cmd
}

fn queue_file(project: &Path) -> std::path::PathBuf {
    project.join("uploads/.file_queue.json")
}

fn read_queue(project: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(queue_file(project)).unwrap()).unwrap()
}

#[test]
fn add_then_stats_counts_by_type() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    let file = uploads.join("abc_numbered_pattern.png");
    fs::write(&file, vec![0u8; 2048]).unwrap();

    cmd(dir.path())
        .args(["queue", "add"])
        .arg(&file)
        .args(["--id", "abc", "--kind", "pattern"])
        .assert()
        .success()
        .stdout(contains("abc_numbered_pattern.png"));

    let output = cmd(dir.path()).args(["queue", "stats"]).output().unwrap();
    assert!(output.status.success());
    let stats: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_files"], 1);
    assert_eq!(stats["max_queue_size"], 100);
    assert_eq!(stats["files_by_type"]["pattern"], 1);
}

#[test]
fn adding_a_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["queue", "add", "uploads/ghost.png", "--id", "g"])
        .assert()
        .code(1)
        .stdout(contains("ghost.png"));
}

#[test]
fn remove_by_id_deletes_files() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    for name in ["x_numbered_pattern.png", "x_preview.png"] {
        let path = uploads.join(name);
        fs::write(&path, b"png").unwrap();
        cmd(dir.path())
            .args(["queue", "add"])
            .arg(&path)
            .args(["--id", "x"])
            .assert()
            .success();
    }

    cmd(dir.path())
        .args(["queue", "remove", "--id", "x"])
        .assert()
        .success()
        .stdout(contains(": 2"));

    assert!(!uploads.join("x_preview.png").exists());
    assert_eq!(read_queue(dir.path()), json!([]));
}

#[test]
fn cleanup_drops_expired_entries() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    let stale = uploads.join("old_input.png");
    fs::write(&stale, b"png").unwrap();
    let entries = json!([{
        "file_id": "old",
        "file_path": stale.to_string_lossy(),
        "file_name": "old_input.png",
        "file_size": 3,
        "timestamp": 1_000_000_000.0,
        "datetime": "2001-09-09T01:46:40",
        "file_type": "input"
    }]);
    fs::write(queue_file(dir.path()), entries.to_string()).unwrap();

    cmd(dir.path())
        .args(["queue", "cleanup"])
        .assert()
        .success()
        .stdout(contains("1"));

    assert!(!stale.exists());
    assert_eq!(read_queue(dir.path()), json!([]));
}

#[test]
fn repair_resets_corrupt_queue() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("uploads")).unwrap();
    fs::write(queue_file(dir.path()), "[{\"file_id\": ").unwrap();

    cmd(dir.path())
        .args(["queue", "repair"])
        .assert()
        .success()
        .stdout(contains("Ошибка JSON"));

    assert_eq!(read_queue(dir.path()), json!([]));
    let backups: Vec<_> = fs::read_dir(dir.path().join("uploads/backups"))
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(backups.len(), 1);
}

#[test]
fn repair_without_queue_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["queue", "repair"])
        .assert()
        .success()
        .stdout(contains("не найден"));
}

#[test]
fn purge_removes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    let file = uploads.join("p.png");
    fs::write(&file, b"png").unwrap();
    cmd(dir.path())
        .args(["queue", "add"])
        .arg(&file)
        .args(["--id", "p"])
        .assert()
        .success();

    cmd(dir.path())
        .args(["queue", "purge"])
        .assert()
        .success()
        .stdout(contains("удалено 1"));
    assert!(!file.exists());
}

#[test]
fn sweep_respects_age_limit() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    fs::write(uploads.join("fresh.png"), b"png").unwrap();

    cmd(dir.path())
        .args(["queue", "sweep"])
        .assert()
        .success()
        .stdout(contains("Удалено файлов: 0"));
    assert!(uploads.join("fresh.png").exists());
}

#[test]
fn relative_entries_resolve_against_project_dir() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let elsewhere = dir.path().join("elsewhere");
    fs::create_dir_all(project.join("uploads")).unwrap();
    fs::create_dir_all(elsewhere.join("uploads")).unwrap();
    fs::write(project.join("uploads/abc_preview.png"), b"png").unwrap();
    fs::write(elsewhere.join("uploads/old_input.png"), b"png").unwrap();
    fs::write(project.join("uploads/old_input.png"), b"png").unwrap();
    let entries = json!([
        {
            "file_id": "abc",
            "file_path": "uploads/abc_preview.png",
            "timestamp": 4_000_000_000.0,
            "file_type": "preview"
        },
        {
            "file_id": "old",
            "file_path": "uploads/old_input.png",
            "timestamp": 1_000_000_000.0,
            "file_type": "input"
        }
    ]);
    fs::write(queue_file(&project), entries.to_string()).unwrap();

    cmd(&project)
        .current_dir(&elsewhere)
        .args(["queue", "repair"])
        .assert()
        .success()
        .stdout(contains("содержит 2 записей"));

    cmd(&project)
        .current_dir(&elsewhere)
        .args(["queue", "cleanup"])
        .assert()
        .success();

    assert!(!project.join("uploads/old_input.png").exists());
    assert!(elsewhere.join("uploads/old_input.png").exists());
    assert!(project.join("uploads/abc_preview.png").exists());
    assert_eq!(read_queue(&project).as_array().unwrap().len(), 1);
}

#[test]
fn explicit_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .arg("--config")
        .arg(dir.path().join("typo.yaml"))
        .args(["queue", "stats"])
        .assert()
        .code(1)
        .stdout(contains("typo.yaml"));
}

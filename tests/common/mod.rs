#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated project directory plus a `bin/` that is the only thing on PATH.
pub struct TestEnv {
    _tmp: TempDir,
    pub project: PathBuf,
    pub bin: PathBuf,
}

/// How the stub `docker-compose` behaves.
pub struct ComposeStub<'a> {
    pub ps_output: &'a str,
    pub fail_subcommand: Option<&'a str>,
}

impl Default for ComposeStub<'_> {
    fn default() -> Self {
        Self {
            ps_output: "cross_stitch_web_1   uvicorn main:app   Up 2 seconds   0.0.0.0:8080->8000/tcp",
            fail_subcommand: None,
        }
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let project = tmp.path().join("project");
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&project).expect("create project dir");
        fs::create_dir_all(&bin).expect("create bin dir");
        Self {
            _tmp: tmp,
            project,
            bin,
        }
    }

    /// Install both stub tools.
    pub fn with_tools(self, compose: ComposeStub<'_>) -> Self {
        self.install_docker();
        self.install_compose(compose);
        self
    }

    pub fn install_docker(&self) {
        self.write_script("docker", "#!/bin/sh\necho \"Docker version 27.0.0\"\nexit 0\n");
    }

    pub fn install_compose(&self, stub: ComposeStub<'_>) {
        let fail = stub
            .fail_subcommand
            .map(|sub| format!("if [ \"$1\" = \"{sub}\" ]; then echo \"{sub} failed\" >&2; exit 1; fi\n"))
            .unwrap_or_default();
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> \"{calls}\"\n{fail}case \"$1\" in\n  --version) echo \"docker-compose version 1.29.2\" ;;\n  ps) echo \"{ps}\" ;;\n  logs) echo \"web_1 | ERROR: address already in use\" ;;\nesac\nexit 0\n",
            calls = self.calls_log().display(),
            ps = stub.ps_output,
        );
        self.write_script("docker-compose", &script);
    }

    fn write_script(&self, name: &str, body: &str) {
        let path = self.bin.join(name);
        fs::write(&path, body).expect("write stub");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub");
    }

    pub fn calls_log(&self) -> PathBuf {
        self.bin.join("calls.log")
    }

    /// Every recorded `docker-compose` invocation, one per line.
    pub fn compose_calls(&self) -> Vec<String> {
        fs::read_to_string(self.calls_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("stitchctl");
        cmd.env("PATH", &self.bin)
            .env_remove("RUST_LOG")
            .arg("--dir")
            .arg(&self.project);
        cmd
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.project.join(rel)
    }
}

/// Answer exactly one HTTP request with `status_line`; returns the bound port.
pub fn one_shot_http(status_line: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let port = listener.local_addr().expect("local addr").port();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let response =
                format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(response.as_bytes());
        }
    });
    port
}

pub fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

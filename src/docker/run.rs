use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::types::{CancelToken, CommandResult, ComposeCommand, OutputLine};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Spawn a compose command and return a channel that streams its output.
///
/// The caller receives [`OutputLine::Stdout`]/[`Stderr`] as they arrive,
/// followed by exactly one [`OutputLine::Done`] carrying the final result.
pub fn spawn(cmd: ComposeCommand, cancel: CancelToken) -> Result<Receiver<OutputLine>> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &cmd.work_dir {
        command.current_dir(dir);
    }

    tracing::debug!(command = %cmd.display(), "spawning");
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", cmd.display()))?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        supervise(child, stdout, stderr, tx, cancel, cmd.timeout);
    });

    Ok(rx)
}

/// Run a command to completion, discarding the streamed lines and returning
/// the accumulated result.
pub fn run_to_end(cmd: ComposeCommand, cancel: &CancelToken) -> Result<CommandResult> {
    let rx = spawn(cmd, cancel.clone())?;
    for line in rx {
        if let OutputLine::Done(result) = line {
            return Ok(result);
        }
    }
    anyhow::bail!("command runner exited without a result")
}

fn supervise(
    mut child: Child,
    stdout: impl Read + Send + 'static,
    stderr: impl Read + Send + 'static,
    tx: Sender<OutputLine>,
    cancel: CancelToken,
    timeout: Duration,
) {
    let log_buf = Arc::new(Mutex::new(String::new()));

    let stdout_handle = pump(stdout, tx.clone(), log_buf.clone(), OutputLine::Stdout);
    let stderr_handle = pump(stderr, tx.clone(), log_buf.clone(), OutputLine::Stderr);

    let start = Instant::now();
    let mut cancelled = false;
    let mut timed_out = false;

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => break None,
        }

        if cancel.is_cancelled() {
            cancelled = true;
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }

        if start.elapsed() > timeout {
            timed_out = true;
            tracing::warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    let exit_code = exit_status.and_then(|s| s.code());
    let log = log_buf.lock().map(|b| b.clone()).unwrap_or_default();

    let _ = tx.send(OutputLine::Done(CommandResult {
        success: exit_code == Some(0),
        exit_code,
        log,
        cancelled,
        timed_out,
    }));
}

fn pump(
    stream: impl Read + Send + 'static,
    tx: Sender<OutputLine>,
    log_buf: Arc<Mutex<String>>,
    wrap: fn(String) -> OutputLine,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if let Ok(mut buf) = log_buf.lock() {
                buf.push_str(&line);
                buf.push('\n');
            }
            // Receiver may be dropped; ignore send errors.
            let _ = tx.send(wrap(line));
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> ComposeCommand {
        ComposeCommand {
            program: "/bin/sh".into(),
            args: vec!["-c".into(), script.into()],
            work_dir: None,
            timeout,
        }
    }

    #[test]
    fn streams_lines_then_done() {
        let rx = spawn(
            sh("echo one; echo two 1>&2; exit 3", Duration::from_secs(10)),
            CancelToken::new(),
        )
        .unwrap();

        let events: Vec<_> = rx.into_iter().collect();
        let Some(OutputLine::Done(result)) = events.last() else {
            panic!("last event must be Done");
        };
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.log.contains("one"));
        assert!(result.log.contains("two"));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, OutputLine::Stderr(l) if l == "two"))
        );
    }

    #[test]
    fn run_to_end_collects_success() {
        let result = run_to_end(
            sh("echo Up 2 minutes", Duration::from_secs(10)),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(result.success);
        assert_eq!(result.log, "Up 2 minutes\n");
    }

    #[test]
    fn timeout_kills_child() {
        let result = run_to_end(
            sh("exec sleep 30", Duration::from_millis(300)),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(result.timed_out);
        assert!(!result.success);
    }

    #[test]
    fn cancel_kills_child() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = run_to_end(sh("exec sleep 30", Duration::from_secs(60)), &cancel).unwrap();
        assert!(result.cancelled);
        assert!(!result.success);
    }

    #[test]
    fn spawn_fails_for_missing_program() {
        let cmd = ComposeCommand {
            program: "stitchctl-no-such-binary".into(),
            args: Vec::new(),
            work_dir: None,
            timeout: Duration::from_secs(1),
        };
        assert!(spawn(cmd, CancelToken::new()).is_err());
    }
}

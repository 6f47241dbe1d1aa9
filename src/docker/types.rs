use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Cooperative cancellation token backed by an `AtomicBool`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sleep for `duration` in short slices, returning early on cancellation.
    /// Returns `false` if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// One invocation of the compose tool. `program` plus `args` is the full argv;
/// the deploy layer is responsible for assembling it.
#[derive(Debug, Clone)]
pub struct ComposeCommand {
    pub program: String,
    pub args: Vec<String>,
    pub work_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl ComposeCommand {
    /// Render as a shell-style string for log lines.
    pub fn display(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// Outcome of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub log: String,
    pub cancelled: bool,
    pub timed_out: bool,
}

/// Streamed output from a running command.
#[derive(Debug)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
    Done(CommandResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_token_is_visible_across_clones() {
        let a = CancelToken::new();
        let b = a.clone();
        a.cancel();
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn sleep_returns_early_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn zero_sleep_completes() {
        assert!(CancelToken::new().sleep(Duration::ZERO));
    }

    #[test]
    fn display_quotes_arguments() {
        let cmd = ComposeCommand {
            program: "docker-compose".into(),
            args: vec!["logs".into(), "--tail=50".into(), "web app".into()],
            work_dir: None,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(cmd.display(), "docker-compose logs '--tail=50' 'web app'");
    }
}

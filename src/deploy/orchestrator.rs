use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{Result, bail};

use crate::docker::{self, CancelToken, ComposeCommand, OutputLine};
use crate::error::DeployError;

use super::commands;
use super::health;
use super::types::{DeployEvent, DeployPlan, DeployReport, Step, StepOutcome};
use super::workspace;

type CommandBuilder = fn(&DeployPlan, &Path) -> Result<ComposeCommand>;

const CANCELLED: &str = "Cancelled by user";

/// Launch the deploy sequence on a background thread.
///
/// Returns a receiver that streams `DeployEvent` values. The final event is
/// always either `Completed` or `Aborted`.
pub fn run_deploy(plan: DeployPlan, root: PathBuf, cancel: CancelToken) -> Receiver<DeployEvent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut run = Run {
            plan: &plan,
            root: &root,
            cancel: &cancel,
            tx: &tx,
            report: DeployReport::new(&plan),
        };
        let last = match run.execute() {
            Some(()) => DeployEvent::Completed(run.report),
            None => DeployEvent::Aborted(CANCELLED.into()),
        };
        let _ = tx.send(last);
    });
    rx
}

/// Run the deploy to completion, handing every event to `on_event`.
///
/// A failed deploy is still `Ok`: inspect `report.failure`. Only
/// cancellation turns into an error.
pub fn deploy(
    plan: DeployPlan,
    root: PathBuf,
    cancel: CancelToken,
    mut on_event: impl FnMut(&DeployEvent),
) -> Result<DeployReport> {
    for event in run_deploy(plan, root, cancel) {
        on_event(&event);
        match event {
            DeployEvent::Completed(report) => return Ok(report),
            DeployEvent::Aborted(reason) => {
                tracing::warn!(%reason, "deploy aborted");
                return Err(DeployError::Cancelled.into());
            }
            _ => {}
        }
    }
    bail!("deploy runner exited without a result")
}

struct StepRun {
    success: bool,
    exit_code: Option<i32>,
    log: String,
    cancelled: bool,
}

struct Run<'a> {
    plan: &'a DeployPlan,
    root: &'a Path,
    cancel: &'a CancelToken,
    tx: &'a Sender<DeployEvent>,
    report: DeployReport,
}

impl Run<'_> {
    /// `None` means the run was cancelled.
    fn execute(&mut self) -> Option<()> {
        // ── Tools ─────────────────────────────────────────────────────────
        self.check_cancel()?;
        self.start(Step::CheckTools);
        let tools = docker::ensure_tools(&self.plan.docker_bin, &self.plan.compose_bin);
        self.finish(Step::CheckTools, tools.is_ok());
        if let Err(e) = tools {
            self.report.failure = Some(e);
            return Some(());
        }

        // ── Workspace ─────────────────────────────────────────────────────
        self.start(Step::PrepareWorkspace);
        match workspace::prepare(self.root, &self.plan.directories) {
            Ok(ws) => {
                self.finish(Step::PrepareWorkspace, true);
                self.report.workspace = Some(ws);
            }
            Err(e) => {
                self.finish(Step::PrepareWorkspace, false);
                self.report.failure = Some(DeployError::Workspace {
                    message: format!("{e:#}"),
                });
                return Some(());
            }
        }

        // ── Down / build / up ─────────────────────────────────────────────
        let sequence = [
            (Step::Down, commands::down as CommandBuilder),
            (Step::Build, commands::build as CommandBuilder),
            (Step::Up, commands::up as CommandBuilder),
        ];
        for (step, builder) in sequence {
            self.check_cancel()?;
            let outcome = self.run_step(step, builder)?;
            if !outcome.success {
                return self.fail(DeployError::step_failed(step, outcome.exit_code));
            }
        }

        // ── Settle ────────────────────────────────────────────────────────
        self.check_cancel()?;
        self.start(Step::Settle);
        tracing::info!(secs = self.plan.settle.as_secs(), "waiting for containers to settle");
        if !self.cancel.sleep(self.plan.settle) {
            return None;
        }
        self.finish(Step::Settle, true);

        // ── Status ────────────────────────────────────────────────────────
        self.start(Step::Status);
        let status = self.exec(Step::Status, commands::ps);
        if status.cancelled {
            return None;
        }
        let up = health::status_is_up(&status.log);
        self.report.status_output = Some(status.log);
        self.finish(Step::Status, up);
        if !up {
            return self.fail(DeployError::NotUp);
        }

        // ── Probe ─────────────────────────────────────────────────────────
        if self.plan.probe {
            self.check_cancel()?;
            self.start(Step::Probe);
            let outcome = health::probe(
                &self.plan.probe_url(),
                self.plan.probe_timeout,
                &self.plan.accepted_status,
            );
            self.log(Step::Probe, format!("HTTP {}", outcome.code()));
            let healthy = outcome.healthy;
            let code = outcome.code();
            self.report.probe = Some(outcome);
            self.finish(Step::Probe, healthy);
            if !healthy {
                return self.fail(DeployError::Unhealthy { status: code });
            }
        }

        self.report.success = true;
        Some(())
    }

    /// Record a failure and dump recent logs where that helps.
    fn fail(&mut self, failure: DeployError) -> Option<()> {
        tracing::error!(%failure, "deploy failed");
        let wants_logs = failure.wants_logs();
        self.report.failure = Some(failure);
        if wants_logs {
            self.check_cancel()?;
            self.start(Step::Logs);
            let logs = self.exec(Step::Logs, commands::logs);
            if logs.cancelled {
                return None;
            }
            self.finish(Step::Logs, logs.success);
            self.report.logs = Some(logs.log);
        }
        Some(())
    }

    fn run_step(&mut self, step: Step, builder: CommandBuilder) -> Option<StepRun> {
        self.start(step);
        let outcome = self.exec(step, builder);
        if outcome.cancelled {
            return None;
        }
        self.finish(step, outcome.success);
        Some(outcome)
    }

    /// Run one compose command, forwarding its lines as `DeployEvent::Log`.
    fn exec(&self, step: Step, builder: CommandBuilder) -> StepRun {
        let spawned = builder(self.plan, self.root)
            .and_then(|cmd| docker::spawn(cmd, self.cancel.clone()));
        let rx = match spawned {
            Ok(rx) => rx,
            Err(e) => {
                let line = format!("Failed to start {step}: {e:#}");
                self.log(step, line.clone());
                return StepRun {
                    success: false,
                    exit_code: None,
                    log: line,
                    cancelled: false,
                };
            }
        };

        let mut log = String::new();
        for line in rx {
            match line {
                OutputLine::Stdout(s) | OutputLine::Stderr(s) => {
                    log.push_str(&s);
                    log.push('\n');
                    self.log(step, s);
                }
                OutputLine::Done(result) => {
                    if log.is_empty() {
                        log = result.log;
                    }
                    if result.timed_out {
                        tracing::warn!(%step, "step timed out");
                    }
                    return StepRun {
                        success: result.success && !result.cancelled,
                        exit_code: result.exit_code,
                        log,
                        cancelled: result.cancelled,
                    };
                }
            }
        }

        StepRun {
            success: false,
            exit_code: None,
            log,
            cancelled: self.cancel.is_cancelled(),
        }
    }

    fn check_cancel(&self) -> Option<()> {
        if self.cancel.is_cancelled() { None } else { Some(()) }
    }

    fn start(&self, step: Step) {
        tracing::debug!(%step, "step started");
        let _ = self.tx.send(DeployEvent::StepStarted(step));
    }

    fn log(&self, step: Step, line: String) {
        let _ = self.tx.send(DeployEvent::Log { step, line });
    }

    fn finish(&mut self, step: Step, success: bool) {
        tracing::debug!(%step, success, "step finished");
        self.report.steps.push(StepOutcome { step, success });
        let _ = self.tx.send(DeployEvent::StepFinished { step, success });
    }
}

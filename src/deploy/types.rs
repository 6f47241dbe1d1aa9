use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{Config, Profile};
use crate::error::DeployError;

use super::health::ProbeOutcome;
use super::workspace::WorkspaceReport;

/// Command-line overrides layered on top of [`Config`].
#[derive(Debug, Clone, Default)]
pub struct PlanOverrides {
    pub profile: Option<Profile>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub settle_secs: Option<u64>,
    pub no_probe: bool,
}

/// Fully resolved parameters for one deploy run.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub profile: Profile,
    pub host: String,
    pub port: u16,
    pub docker_bin: String,
    pub compose_bin: String,
    pub settle: Duration,
    pub command_timeout: Duration,
    pub probe_timeout: Duration,
    pub probe: bool,
    pub log_tail: usize,
    pub accepted_status: Vec<u16>,
    pub directories: Vec<String>,
}

impl DeployPlan {
    pub fn from_config(cfg: &Config, overrides: &PlanOverrides) -> Self {
        let profile = overrides.profile.unwrap_or(cfg.profile);
        let host = match profile {
            Profile::Dev => overrides.host.clone().unwrap_or_else(|| cfg.host.clone()),
            Profile::Prod => "localhost".to_string(),
        };
        Self {
            profile,
            host,
            port: profile.resolve_port(cfg, overrides.port),
            docker_bin: cfg.docker_bin.clone(),
            compose_bin: cfg.compose_bin.clone(),
            settle: Duration::from_secs(overrides.settle_secs.unwrap_or(cfg.settle_secs)),
            command_timeout: Duration::from_secs(cfg.command_timeout),
            probe_timeout: Duration::from_secs(cfg.probe_timeout),
            probe: profile.probes_http() && !overrides.no_probe,
            log_tail: cfg.log_tail,
            accepted_status: cfg.accepted_status.clone(),
            directories: cfg.directories.clone(),
        }
    }

    /// Address printed to the operator once the deploy succeeds. The prod
    /// profile always serves on 80 and prints the bare host.
    pub fn url(&self) -> String {
        match self.profile {
            Profile::Prod => format!("http://{}", self.host),
            Profile::Dev => format!("http://{}:{}", self.host, self.port),
        }
    }

    /// Target of the one-shot HTTP probe.
    pub fn probe_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// Identifies which deploy step is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    CheckTools,
    PrepareWorkspace,
    Down,
    Build,
    Up,
    Settle,
    Status,
    Probe,
    Logs,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::CheckTools => "check-tools",
            Step::PrepareWorkspace => "prepare-workspace",
            Step::Down => "down",
            Step::Build => "build",
            Step::Up => "up",
            Step::Settle => "settle",
            Step::Status => "status",
            Step::Probe => "probe",
            Step::Logs => "logs",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: Step,
    pub success: bool,
}

/// Summary of one deploy run, printed as JSON with `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    pub profile: Profile,
    pub url: String,
    pub steps: Vec<StepOutcome>,
    pub workspace: Option<WorkspaceReport>,
    pub status_output: Option<String>,
    pub probe: Option<ProbeOutcome>,
    pub logs: Option<String>,
    pub success: bool,
    pub failure: Option<DeployError>,
}

impl DeployReport {
    pub fn new(plan: &DeployPlan) -> Self {
        Self {
            profile: plan.profile,
            url: plan.url(),
            steps: Vec::new(),
            workspace: None,
            status_output: None,
            probe: None,
            logs: None,
            success: false,
            failure: None,
        }
    }
}

/// Events emitted by the deploy orchestrator.
#[derive(Debug)]
pub enum DeployEvent {
    StepStarted(Step),
    Log { step: Step, line: String },
    StepFinished { step: Step, success: bool },
    Completed(DeployReport),
    Aborted(String),
}

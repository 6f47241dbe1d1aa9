use serde::{Deserialize, Serialize};

use crate::deploy::Step;

/// Terminal deploy failures. Every variant maps to exit status 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeployError {
    #[error("{tool} не установлен")]
    MissingTool { tool: String },

    #[error("failed to prepare workspace: {message}")]
    Workspace { message: String },

    #[error("step `{step}` failed (exit code {code})")]
    StepFailed { step: Step, code: String },

    #[error("containers are not running")]
    NotUp,

    #[error("health check failed: HTTP {status}")]
    Unhealthy { status: String },

    #[error("deployment cancelled")]
    Cancelled,
}

impl DeployError {
    pub fn step_failed(step: Step, code: Option<i32>) -> Self {
        DeployError::StepFailed {
            step,
            code: code.map_or_else(|| "none".to_string(), |c| c.to_string()),
        }
    }

    /// Whether recent container logs are worth dumping for this failure.
    pub fn wants_logs(&self) -> bool {
        matches!(
            self,
            DeployError::StepFailed { .. } | DeployError::NotUp | DeployError::Unhealthy { .. }
        )
    }
}

pub mod commands;
pub mod health;
pub mod orchestrator;
mod types;
pub mod workspace;

pub use orchestrator::{deploy, run_deploy};
pub use types::{DeployEvent, DeployPlan, DeployReport, PlanOverrides, Step, StepOutcome};

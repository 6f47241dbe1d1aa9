use std::path::Path;

use anyhow::Result;

use crate::docker::{ComposeCommand, compose_argv};

use super::types::DeployPlan;

/// Assemble a compose invocation, honouring multi-word binaries such as
/// `docker compose`.
fn compose(plan: &DeployPlan, root: &Path, sub: &[&str]) -> Result<ComposeCommand> {
    let (program, mut args) = compose_argv(&plan.compose_bin)?;
    args.extend(sub.iter().map(|s| s.to_string()));
    Ok(ComposeCommand {
        program,
        args,
        work_dir: Some(root.to_path_buf()),
        timeout: plan.command_timeout,
    })
}

/// `down`, with `--remove-orphans` for profiles that ask for it.
pub fn down(plan: &DeployPlan, root: &Path) -> Result<ComposeCommand> {
    if plan.profile.removes_orphans() {
        compose(plan, root, &["down", "--remove-orphans"])
    } else {
        compose(plan, root, &["down"])
    }
}

pub fn build(plan: &DeployPlan, root: &Path) -> Result<ComposeCommand> {
    compose(plan, root, &["build", "--no-cache"])
}

pub fn up(plan: &DeployPlan, root: &Path) -> Result<ComposeCommand> {
    compose(plan, root, &["up", "-d"])
}

pub fn ps(plan: &DeployPlan, root: &Path) -> Result<ComposeCommand> {
    compose(plan, root, &["ps"])
}

pub fn logs(plan: &DeployPlan, root: &Path) -> Result<ComposeCommand> {
    let tail = format!("--tail={}", plan.log_tail);
    compose(plan, root, &["logs", tail.as_str()])
}

use std::process::{Command, Stdio};

use anyhow::{Result, bail};

use crate::error::DeployError;

/// Split a configured binary such as `docker compose` into program and
/// leading arguments.
pub fn compose_argv(bin: &str) -> Result<(String, Vec<String>)> {
    let mut words = shell_words::split(bin)?;
    if words.is_empty() {
        bail!("binary name cannot be blank");
    }
    let program = words.remove(0);
    Ok((program, words))
}

/// Verify both the container tool and its compose companion respond to
/// `--version`. Checks `docker` first, then `docker-compose`.
pub fn ensure_tools(docker_bin: &str, compose_bin: &str) -> Result<(), DeployError> {
    for bin in [docker_bin, compose_bin] {
        if !tool_responds(bin) {
            tracing::error!(tool = %bin, "required tool missing");
            return Err(DeployError::MissingTool {
                tool: bin.to_string(),
            });
        }
        tracing::debug!(tool = %bin, "tool present");
    }
    Ok(())
}

fn tool_responds(bin: &str) -> bool {
    let Ok((program, mut args)) = compose_argv(bin) else {
        return false;
    };
    args.push("--version".into());
    Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_argv_splits_plugin_form() {
        let (program, args) = compose_argv("docker compose").unwrap();
        assert_eq!(program, "docker");
        assert_eq!(args, vec!["compose"]);
    }

    #[test]
    fn compose_argv_rejects_blank() {
        assert!(compose_argv("   ").is_err());
    }

    #[test]
    fn ensure_tools_reports_first_missing_tool() {
        match ensure_tools(
            "stitchctl-definitely-missing-docker",
            "stitchctl-definitely-missing-compose",
        ) {
            Err(DeployError::MissingTool { tool }) => {
                assert_eq!(tool, "stitchctl-definitely-missing-docker");
            }
            other => panic!("expected MissingTool, got {other:?}"),
        }
    }
}

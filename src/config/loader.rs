use std::path::Path;

use anyhow::{Context, Result};

use super::Config;

pub const CONFIG_FILE: &str = ".stitchctl.yaml";

/// Load `.stitchctl.yaml` from `dir`, falling back to defaults when absent.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load config from an explicit path. Missing or malformed files are errors.
pub fn load_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load(dir.path()).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.profile, Profile::Dev);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "profile: prod\nsettle_secs: 3\ncompose_bin: docker compose\n",
        )
        .unwrap();

        let cfg = load(dir.path()).unwrap();
        assert_eq!(cfg.profile, Profile::Prod);
        assert_eq!(cfg.settle_secs, 3);
        assert_eq!(cfg.compose_bin, "docker compose");
        assert_eq!(cfg.log_tail, 50);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "\n").unwrap();
        assert_eq!(load(dir.path()).unwrap().port, 8080);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from(&dir.path().join("typo.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("typo.yaml"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "port: not-a-number\n").unwrap();
        assert!(load(dir.path()).is_err());
    }
}

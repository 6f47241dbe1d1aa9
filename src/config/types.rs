use serde::{Deserialize, Serialize};

/// Which flavour of the deploy sequence to run.
///
/// `Dev` takes the port from the command line, removes orphaned containers on
/// teardown and probes the HTTP endpoint. `Prod` is pinned to port 80 and only
/// checks container status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Dev,
    Prod,
}

impl Profile {
    pub const PROD_PORT: u16 = 80;

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Dev => "dev",
            Profile::Prod => "prod",
        }
    }

    /// Port the deployment is reachable on. `Prod` ignores any override.
    pub fn resolve_port(self, cfg: &Config, cli_port: Option<u16>) -> u16 {
        match self {
            Profile::Dev => cli_port.unwrap_or(cfg.port),
            Profile::Prod => Self::PROD_PORT,
        }
    }

    pub fn removes_orphans(self) -> bool {
        matches!(self, Profile::Dev)
    }

    pub fn probes_http(self) -> bool {
        matches!(self, Profile::Dev)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: Profile,
    pub port: u16,
    pub host: String,
    pub docker_bin: String,
    /// May contain arguments, e.g. `docker compose`.
    pub compose_bin: String,
    pub settle_secs: u64,
    pub command_timeout: u64,
    pub probe_timeout: u64,
    pub log_tail: usize,
    pub accepted_status: Vec<u16>,
    pub directories: Vec<String>,
    pub upload_dir: String,
    pub max_queue_size: usize,
    pub max_file_age_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::Dev,
            port: 8080,
            host: "localhost".to_string(),
            docker_bin: "docker".to_string(),
            compose_bin: "docker-compose".to_string(),
            settle_secs: 10,
            command_timeout: 1800,
            probe_timeout: 10,
            log_tail: 50,
            accepted_status: vec![200, 301, 302],
            directories: ["nginx", "ssl", "uploads", "static"]
                .into_iter()
                .map(String::from)
                .collect(),
            upload_dir: "uploads".to_string(),
            max_queue_size: 100,
            max_file_age_hours: 1,
        }
    }
}

// Readiness heuristic: substring check on `ps` output plus a single HTTP GET.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};

const STATUS_MARKER: &str = "Up";

/// `true` when the compose status listing shows at least one running container.
pub fn status_is_up(output: &str) -> bool {
    output.contains(STATUS_MARKER)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub url: String,
    /// `None` when no HTTP response arrived at all.
    pub status: Option<u16>,
    pub healthy: bool,
}

impl ProbeOutcome {
    /// Status as printed to the operator; `000` when the request never completed.
    pub fn code(&self) -> String {
        self.status
            .map_or_else(|| "000".to_string(), |s| format!("{s:03}"))
    }
}

/// Issue one GET against `url` without following redirects.
pub fn probe(url: &str, timeout: Duration, accepted: &[u16]) -> ProbeOutcome {
    let status = match fetch_status(url, timeout) {
        Ok(code) => Some(code),
        Err(e) => {
            tracing::warn!(url, error = %e, "probe request failed");
            None
        }
    };
    let healthy = status.is_some_and(|s| accepted.contains(&s));
    tracing::info!(url, status = ?status, healthy, "probe finished");
    ProbeOutcome {
        url: url.to_string(),
        status,
        healthy,
    }
}

fn fetch_status(url: &str, timeout: Duration) -> reqwest::Result<u16> {
    let client = Client::builder()
        .redirect(Policy::none())
        .timeout(timeout)
        .build()?;
    let response = client.get(url).send()?;
    Ok(response.status().as_u16())
}

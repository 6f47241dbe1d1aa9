use std::time::Duration;

use crate::docker::CancelToken;

use super::manager::QueueManager;

/// Timing of the periodic cleanup loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSchedule {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub error_backoff: Duration,
}

impl Default for CleanupSchedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(60),
            interval: Duration::from_secs(300),
            error_backoff: Duration::from_secs(60),
        }
    }
}

/// Run age cleanup plus capacity enforcement on a fixed schedule until
/// `cancel` fires. Returns the total number of files deleted.
pub fn run_cleanup_loop(
    manager: &QueueManager,
    schedule: CleanupSchedule,
    cancel: &CancelToken,
) -> usize {
    tracing::info!(?schedule, "cleanup loop started");
    let mut total = 0;

    if !cancel.sleep(schedule.initial_delay) {
        return total;
    }

    loop {
        let pass = manager
            .cleanup_old_files()
            .and_then(|aged| Ok(aged + manager.enforce_queue_size()?));

        let pause = match pass {
            Ok(removed) => {
                total += removed;
                if removed > 0 {
                    tracing::info!(removed, total, "cleanup pass finished");
                }
                schedule.interval
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "cleanup pass failed");
                schedule.error_backoff
            }
        };

        if !cancel.sleep(pause) {
            tracing::info!(total, "cleanup loop stopped");
            return total;
        }
    }
}

// Upload queue maintenance: the `.file_queue.json` register the web app keeps
// in `uploads/`, plus repair, sweeping and the periodic cleanup loop.

mod manager;
pub mod repair;
pub mod store;
pub mod sweep;
mod types;
pub mod watch;

pub use manager::QueueManager;
pub use repair::{RepairOutcome, repair_queue};
pub use sweep::sweep_stale;
pub use types::{FileEntry, FileKind, QueueStats, iso_datetime};
pub use watch::{CleanupSchedule, run_cleanup_loop};

// Container tool plumbing: tool detection, streaming command runner, cancellation.

pub mod engine;
pub mod run;
pub mod types;

pub use engine::{compose_argv, ensure_tools};
pub use run::{run_to_end, spawn};
pub use types::{CancelToken, CommandResult, ComposeCommand, OutputLine};

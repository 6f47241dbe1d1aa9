use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Profile;
use crate::queue::FileKind;

pub const DEFAULT_LOG_FILTER: &str = "stitchctl=warn";

/// Deploy and maintain the cross-stitch pattern web app.
#[derive(Parser, Debug)]
#[command(name = "stitchctl", version, about)]
pub struct Cli {
    /// Log level filter (e.g. "stitchctl=debug")
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Project directory holding docker-compose.yml
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Config file (defaults to .stitchctl.yaml in the project directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild and restart the containers, then check they came up
    Deploy(DeployArgs),
    /// Show container status and whether anything is running
    Status,
    /// Print recent container logs
    Logs {
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Maintain the upload queue
    Queue(QueueArgs),
}

#[derive(clap::Args, Debug)]
pub struct DeployArgs {
    /// Port the app is published on (dev profile only)
    pub port: Option<u16>,

    #[arg(long, value_enum)]
    pub profile: Option<Profile>,

    #[arg(long)]
    pub host: Option<String>,

    /// Seconds to wait after `up` before checking status
    #[arg(long)]
    pub settle_secs: Option<u64>,

    /// Skip the HTTP probe
    #[arg(long, default_value_t = false)]
    pub no_probe: bool,

    /// Print the deploy report as JSON instead of progress output
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct QueueArgs {
    /// Upload directory (defaults to the configured one)
    #[arg(long, global = true)]
    pub upload_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub max_size: Option<usize>,

    #[arg(long, global = true)]
    pub max_age_hours: Option<u64>,

    #[command(subcommand)]
    pub command: QueueCommands,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// List queued files
    List,
    /// Print queue statistics as JSON
    Stats,
    /// Register an existing file
    Add {
        path: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "pattern")]
        kind: FileKind,
    },
    /// Remove a file by path, or every file sharing an id
    Remove {
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        path: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete expired files and trim the queue to capacity
    Cleanup,
    /// Delete every queued file
    Purge,
    /// Fix an empty, corrupt or stale queue file
    Repair,
    /// Delete old files in the upload directory by modification time
    Sweep,
    /// Run the periodic cleanup loop in the foreground
    Watch {
        #[arg(long, default_value_t = 60)]
        initial_delay_secs: u64,
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

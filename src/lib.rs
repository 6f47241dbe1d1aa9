pub mod cli;
pub mod config;
pub mod deploy;
pub mod docker;
pub mod error;
pub mod queue;

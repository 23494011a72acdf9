//! Command line interface: argument parsing, output, and command dispatch.

pub mod args;
pub mod commands;
pub mod output;
pub mod retry_config;

pub use args::{Args, Command};
pub use output::OutputManager;
pub use retry_config::RetryConfig;

use crate::error::Result;

/// Parse arguments and run the selected subcommand, returning the exit code.
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    commands::execute_command(args).await
}

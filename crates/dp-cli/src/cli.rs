//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// deter-publish - Intersect DETER Cerrado alerts with counties and
/// conservation units and publish them for the map server
#[derive(Parser, Debug)]
#[command(name = "dp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output (logs every statement issued)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "DP_CONFIG",
        default_value = dp_core::config::DEFAULT_CONFIG_FILE
    )]
    pub config: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the intersection pipeline and publish new alerts
    Intersections(IntersectionsArgs),

    /// Drop the intermediary (jobber) tables
    DropIntermediary,

    /// Drop the output table
    DropOutput,

    /// Empty the output table, keeping it in place
    TruncateOutput,

    /// Show the state of the output table
    Status(StatusArgs),
}

/// Arguments for the intersections command
#[derive(Args, Debug)]
pub struct IntersectionsArgs {
    /// Empty the output table first and reprocess every alert
    #[arg(long)]
    pub renew: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

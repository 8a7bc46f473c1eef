//! deter-publish CLI - publishes DETER Cerrado alerts for the map server

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{intersections, maintenance, status};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match &cli.command {
        cli::Commands::Intersections(args) => intersections::execute(args, &cli.global).await,
        cli::Commands::DropIntermediary => maintenance::drop_intermediary(&cli.global).await,
        cli::Commands::DropOutput => maintenance::drop_output(&cli.global).await,
        cli::Commands::TruncateOutput => maintenance::truncate_output(&cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
    }
}

/// `info` by default, `debug` with `--verbose`; `RUST_LOG` wins over both.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

use std::process::ExitCode;

use bringup::cli::Cli;
use clap::Parser;
use platform::CancelToken;
use tracing_subscriber::EnvFilter;

/// Exit status for any failure before or during the transmit loop.
const SETUP_FAILURE: u8 = 255;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    tracing::debug!("{config:?}");

    match bringup::run(&config, &CancelToken::new()) {
        Ok(summary) => {
            tracing::info!(
                "done: {} cycles, {} FIFO writes",
                summary.cycles,
                summary.fill_count
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(SETUP_FAILURE)
        }
    }
}

use std::process::ExitCode;

use clap::Parser;
use finance_tracker_core::FinanceTracker;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let settings = match config::load(&cli.global) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "finance_tracker_core={level},finance_tracker={level}",
            level = settings.log_level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let tracker = match FinanceTracker::from_settings(&settings) {
        Ok(tracker) => tracker,
        Err(err) => {
            tracing::error!("failed to initialise: {err}");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match commands::run(&tracker, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

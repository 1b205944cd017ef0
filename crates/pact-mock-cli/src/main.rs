//! pact-mock - command-line front end for the pact mock server

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve(args) => {
            if !commands::serve::run(args).await? {
                std::process::exit(1);
            }
        }
        Commands::Check { pact } => {
            commands::check::run(&pact)?;
        }
    }

    Ok(())
}

/// Initialize logging/tracing based on verbosity level
///
/// Logs go to stderr so that reports on stdout stay machine readable.
fn init_logging(verbose: u8, json: bool) {
    let filter_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_level.into()));

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

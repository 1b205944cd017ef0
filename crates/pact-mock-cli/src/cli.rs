//! Command-line interface definition using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Pact mock server CLI
#[derive(Parser, Debug)]
#[command(name = "pact-mock")]
#[command(version)]
#[command(about = "Serve pact interactions from a mock server and verify the traffic")]
pub struct Cli {
    /// Increase verbosity (can be used multiple times)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve a pact until interrupted, then verify and print the report
    Serve(ServeArgs),

    /// Validate a pact file and list its interactions
    Check {
        /// Pact file to validate
        #[arg(long, value_name = "FILE")]
        pact: PathBuf,
    },
}

/// Options for `serve`
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Pact file to serve
    #[arg(long, value_name = "FILE")]
    pub pact: PathBuf,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Directory the pact is written to when verification passes
    #[arg(long, value_name = "DIR")]
    pub pact_dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, value_name = "FILE", env = "PACT_MOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Reject query parameters the pact does not mention
    #[arg(long)]
    pub strict_query: bool,

    /// Answer CORS preflight requests
    #[arg(long)]
    pub cors: bool,
}

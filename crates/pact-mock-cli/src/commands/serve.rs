//! Serve command: run a mock server until interrupted, then verify

use crate::cli::ServeArgs;
use anyhow::{Context, Result};
use colored::*;
use pact_matching::QueryMatching;
use pact_mock_server::{read_pact, MockServerManager, ServerConfig, Verification};
use std::io::Write;
use tracing::info;

/// Serve the pact, wait for Ctrl-C and print the verification report
///
/// Returns whether verification passed.
pub async fn run(args: ServeArgs) -> Result<bool> {
    let config = build_config(&args)?;
    let port = args.port.unwrap_or(config.port);

    let pact = read_pact(&args.pact)
        .await
        .with_context(|| format!("Failed to load pact: {}", args.pact.display()))?;
    let manager = MockServerManager::new(config);
    let handle = manager
        .create_from_pact(pact, port)
        .await
        .context("Failed to start mock server")?;

    println!(
        "{} port {} ({})",
        "Mock server listening on".green().bold(),
        handle.port(),
        handle.url()
    );
    std::io::stdout().flush().context("Failed to flush stdout")?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        manager.shutdown_all().await;
        return Err(e).context("Failed to listen for Ctrl-C");
    }
    info!(port = handle.port(), "interrupted, verifying");

    let verification = manager.verify(&handle, None).await?;
    report(verification)
}

/// Print the verification outcome; persistence failures become errors
fn report(verification: Verification) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(&verification.report)?);

    let passed = verification.passed();
    if passed {
        eprintln!("{}", "Verification passed".green().bold());
    } else {
        eprintln!(
            "{} {} mismatch(es)",
            "Verification failed:".red().bold(),
            verification.mismatches().len()
        );
    }

    match verification.pact_file {
        Some(Ok(path)) => eprintln!("{} {}", "Pact written to".bright_blue(), path.display()),
        Some(Err(e)) => return Err(e).context("Failed to write pact file"),
        None => {}
    }

    Ok(passed)
}

/// Merge the configuration file with command-line overrides
fn build_config(args: &ServeArgs) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(dir) = &args.pact_dir {
        config.pact_dir = Some(dir.clone());
    }
    if args.strict_query {
        config.matching.query = QueryMatching::Strict;
    }
    config.cors |= args.cors;
    Ok(config)
}

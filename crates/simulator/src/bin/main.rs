//! Elector simulation CLI
//!
//! Runs one bully or ring election simulation and prints the final report.

use clap::Parser;
use elector_simulator::Cli;
use elector_simulation::Simulator;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.to_config()?;
    let simulator = Simulator::new(config)?;

    let cancel = simulator.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping at the next step");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for ctrl-c"),
        }
    });

    let report = simulator.run().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    if !report.violations.is_empty() {
        warn!(violations = report.violations.len(), "Run ended with invariant violations");
    }

    Ok(())
}

mod cli;
mod commands;
mod config_loader;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use qrl_common::utils::logging::init_logging;
use qrl_rpc::QrlClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse CLI
    let args = cli::Cli::parse();

    // 2. Load Config
    let config = config_loader::load_cli_config(&args)?;

    // 3. Setup Logging
    init_logging(&config.logging).context("Failed to initialise logging")?;
    debug!(?config, "Configuration loaded");

    // 4. Connect, checking the node's schema unless the command reports on it
    let client_config = config_loader::client_config_for(&config, &args.command);
    info!("Connecting to {}", client_config.node);
    let client = QrlClient::connect(&client_config)
        .await
        .with_context(|| format!("Cannot use node {}", client_config.node))?;

    // 5. Run the command
    let output = commands::execute(&client, &args.command, args.json).await?;
    println!("{}", output);

    debug!(metrics = %client.metrics().gather_text(), "Client metrics");
    Ok(())
}

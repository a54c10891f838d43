//! ambilight: screen-perimeter ambient light producer
//!
//! Main entry point: logging, configuration and subcommand dispatch.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use ambilight::config::AmbilightConfig;

mod cli;
use cli::{Cli, Commands, RunArgs};

mod commands;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config
    let config_path = cli.config.unwrap_or_else(AmbilightConfig::default_path);
    let config = AmbilightConfig::load(&config_path)?;
    debug!("Config: {}", config_path.display());

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => commands::run::run(config, &args).await,
        Commands::Intensity {
            channel,
            delta,
            set,
        } => commands::intensity::run(config, &channel, delta, set),
        Commands::Dump { channel, watch } => commands::dump::run(config, &channel, watch).await,
        Commands::Config { write } => commands::config::run(&config, &config_path, write),
    }
}

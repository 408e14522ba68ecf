mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use siplah_export::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Export(args) => commands::run_export(config, cli.token, args).await?,
        Commands::Status(args) => commands::run_status(config, cli.token, args).await?,
    }

    Ok(())
}

//! foldex CLI entry point.

use anyhow::Result;
use clap::Parser;

use foldex::cli::{commands, Cli, Commands};
use foldex::domain::models::Config;
use foldex::infrastructure::config::ConfigLoader;
use foldex::infrastructure::logging::LoggerImpl;

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => foldex::cli::handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => foldex::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Storm(args) => commands::storm::execute(args, &config, cli.json).await,
        Commands::Config(args) => commands::config::execute(args, &config, cli.json),
    };

    if let Err(err) = result {
        foldex::cli::handle_error(err, cli.json);
    }
}

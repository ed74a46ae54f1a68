// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Plan { components } => commands::plan(&cli.catalog, components, cli.json),
        Commands::Install {
            components,
            max_parallel,
            no_recovery,
        } => {
            commands::install(
                &cli.catalog,
                components,
                max_parallel,
                no_recovery,
                cli.json,
            )
            .await
        }
        Commands::Detect { components } => commands::detect(&cli.catalog, components, cli.json),
    }
}

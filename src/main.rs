mod auth;
mod cli;
mod config;
mod context;
mod error;
mod insights;
mod models;
mod providers;
mod registry;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting AgentLens");
    cli.execute().await?;

    Ok(())
}

mod cli;
mod commands;
mod config;
mod session_store;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{cli::Cli, commands::Shell, config::DiaryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = DiaryConfig::load()?;
    let session_dir = session_store::session_dir(cli.dev)?;

    Shell::new(config, session_dir, cli.dev)
        .run(cli.command)
        .await
}

mod cli;
mod controller;
mod host;
mod hostfs;
mod model;
mod orchestrator;
mod prefs;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args).await
}

//! ListingForge CLI — Amazon listing optimization with Gemini.
//!
//! Runs the HTTP API, or drives single optimizations and history queries
//! from the terminal against the same local database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

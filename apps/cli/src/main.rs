//! MapSweep CLI: exhaustive business discovery over a map area.
//!
//! Recursively partitions a search area until no region's result page is
//! saturated, deduplicates every business found, and stores the results.

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

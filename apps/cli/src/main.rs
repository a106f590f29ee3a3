//! compete CLI: competitive analysis reports from a company URL.
//!
//! Scrapes the target site, discovers its competitors, analyses each one and
//! writes a markdown report.

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

//! kbindex CLI — generator for numbered Markdown topic indexes.
//!
//! Turns an ordered list of topic titles into a linked table of contents
//! with a generation banner, and checks existing indexes for drift.

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

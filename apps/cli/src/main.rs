//! seocontext CLI: product SEO context builder.
//!
//! Collects marketing signals for a product from the configured sources and
//! prints the merged context JSON consumed by content generation.

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

//! Letterpress CLI: parse newsletter templates and apply edits to them.
//!
//! Reads an HTML file, runs one engine operation, and writes the resulting
//! JSON or HTML to stdout or to a file.

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

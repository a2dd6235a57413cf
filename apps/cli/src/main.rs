//! dataembed CLI: embed spreadsheet data into HTML documents as JS literals.
//!
//! Reads the dataset registry from `dataembed.toml`, builds each dataset's
//! literal, and splices it into the anchor block of its target document.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}

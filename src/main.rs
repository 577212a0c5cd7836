//! Binary crate for the `kerala-weather` command-line tool.

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    kerala_core::init()?;

    let mut app = kerala_core::App::new()?;
    app.initialize()?;

    tracing::info!("Kerala weather started");
    let result = cli.run(app.config());

    app.shutdown()?;
    result
}

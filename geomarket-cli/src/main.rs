//! Entry point for the geomarket command-line interface.
#![forbid(unsafe_code)]

mod commands;
mod error;

use clap::Parser;

use crate::commands::Cli;
use crate::error::CliError;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("geomarket: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version requests exit with the right code here.
        Err(err) => err.exit(),
    };
    commands::dispatch(&cli)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments, hand off to `cli::run`.
// - Anything that reaches `main` as an error is fatal and exits non-zero.

use std::process;

use clap::Parser;
use crossterm::style::Stylize;
use gscli::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so they never mix with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Cli::parse();
    if let Err(err) = cli::run(args) {
        eprintln!("{}", format!("Error: {err:#}").red());
        process::exit(1);
    }
}

//! # neurogate - command-line driver for the simulation runtime
//!
//! Runs command scripts and canned scenarios against an in-process runtime.
//! Results go to stdout as JSON lines; logs go to stderr.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use neurogate_cli::NeurogateCli;

fn main() {
    let cli = NeurogateCli::parse();

    // RUST_LOG wins over --verbose, which wins over the config file
    let configured = cli.load_config().ok().and_then(|config| config.log_level);
    let default_level = match (cli.verbose, configured) {
        (true, _) => "debug".to_string(),
        (false, Some(level)) => level,
        (false, None) => "info".to_string(),
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = cli.execute() {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }
}

mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::context::Context;
use cli::{Cli, Commands};

/// Environment variable overriding the log filter, e.g. `KEYWARD_LOG=keyward=trace`.
const LOG_ENV: &str = "KEYWARD_LOG";

fn main() {
    let args = Cli::parse();

    // Logs go to stderr so command output stays clean.
    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    debug!(version = env!("CARGO_PKG_VERSION"), "keyward starting");

    let result = Context::from_cli(&args).and_then(|mut ctx| match &args.command {
        Commands::Key { action } => cli::commands::key::execute(&mut ctx, action),
        Commands::Schedule { action } => cli::commands::schedule::execute(&mut ctx, action),
        Commands::Team { action } => cli::commands::team::execute(&mut ctx, action),
    });

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

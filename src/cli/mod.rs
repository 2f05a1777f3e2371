//! Command-line entry point and startup wiring.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod handlers;
mod repl;

/// AI-powered terminal assistant with man-page retrieval
#[derive(Parser)]
#[command(name = "helix")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    verbose: bool,

    /// Force degraded mode without loading a model
    #[arg(long)]
    mock: bool,

    /// Show commands without executing them
    #[arg(long)]
    dry_run: bool,

    /// Skip the startup connectivity probe
    #[arg(long)]
    offline: bool,

    /// Override the state directory (default: ~/.helix)
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Wire the verbose flag to the tracing log level. RUST_LOG in the
    // environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    repl::run(cli)
}

//! filereach - file reachability testing for AppArmor profiles
//!
//! Main entry point for the filereach CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

use commands::{check, generate};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// filereach - file reachability testing for interfaces
#[derive(Parser)]
#[command(name = "filereach")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to `check` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate checks from a profile against a mounted base snap
    Gen(generate::GenArgs),

    /// Run checks read from stdin
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Console logging to stderr, plus JSON files when a log directory is set.
///
/// Stdout is left alone: `check` reports failures there.
fn init_tracing(verbose: bool, log_dir: Option<&std::path::Path>) -> Option<WorkerGuard> {
    use std::io::IsTerminal;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "filereach=debug,filereach_core=debug,filereach_config=debug,info"
    } else {
        "filereach=info,filereach_core=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_filter(console_filter);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "filereach.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "filereach=trace,filereach_core=trace,filereach_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = filereach_config::load_config(None);
    let _guard = init_tracing(cli.verbose, loaded.config.logging.dir.as_deref());

    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }
    for source in loaded.loaded_from() {
        tracing::debug!(path = %source.display(), "Loaded config");
    }

    let ctx = commands::Context {
        config: loaded.config,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Gen(args)) => generate::run(args, &ctx),
        Some(Commands::Check(args)) => check::run(args, &ctx),
        None => check::run(check::CheckArgs::default(), &ctx),
    }
}

//! Check command - replay generated checks.

use std::io;

use anyhow::{Context as _, Result};
use clap::Args;

use filereach_core::{Checker, HostFs, ReachabilityCheckSet};

use super::Context;

/// Arguments for the check command.
///
/// Checks are always read from stdin.
#[derive(Args, Debug, Default)]
pub struct CheckArgs {}

/// Run the check command.
///
/// Prints one line per path that could not be opened. Nothing is printed
/// when every sample is reachable; the exit status does not change either way.
pub fn run(_args: CheckArgs, ctx: &Context) -> Result<()> {
    let sets = ReachabilityCheckSet::read_all(io::stdin().lock())
        .context("Failed to read checks from stdin")?;

    let failures = Checker::new(HostFs).check_all(&sets);
    for failure in &failures {
        println!("{failure}");
    }

    if ctx.verbose {
        tracing::info!(sets = sets.len(), failures = failures.len(), "Checked reachability");
    }
    Ok(())
}

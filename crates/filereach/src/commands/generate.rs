//! Gen command - derive checks from a profile.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;

use filereach_core::{
    validate_mounted_base, CacheStore, CountingFs, EagerMounts, HostFs, ReachabilityCheckSet,
    SampleGenerator,
};

use super::Context;

/// Arguments for the gen command.
#[derive(Args, Debug)]
pub struct GenArgs {
    /// Capture template rules checks
    #[arg(long)]
    pub template: bool,

    /// Cache file to use instead of the configured one
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Neither read nor write the cache
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Mounted base snap (must contain meta/snap.yaml and usr/)
    #[arg(value_name = "MOUNTED_BASE", value_parser = parse_mounted_base)]
    pub mounted_base: PathBuf,

    /// Profile source to read rules from (`-` for stdin)
    #[arg(value_name = "RULE_SOURCE")]
    pub rule_source: PathBuf,

    /// Where to write the generated checks (`-` for stdout)
    #[arg(value_name = "GEN_CHECKS")]
    pub gen_checks: PathBuf,
}

fn parse_mounted_base(s: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(s);
    validate_mounted_base(&path).map_err(|e| e.to_string())?;
    Ok(path)
}

/// Run the gen command.
pub fn run(args: GenArgs, ctx: &Context) -> Result<()> {
    let source = read_source(&args.rule_source)?;

    // an explicit --cache wins over `cache.enabled = false` in the config
    let cache = match &args.cache {
        _ if args.no_cache => CacheStore::in_memory(),
        Some(path) => CacheStore::load(path)?,
        None if ctx.config.cache.enabled => CacheStore::load(&ctx.config.cache.path)?,
        None => CacheStore::in_memory(),
    };
    let cached = cache.len();

    let eager_mounts = EagerMounts::new().with_extra(ctx.config.mounts.extra_eager.iter().cloned());
    let fs = CountingFs::new(HostFs);
    let mut generator = SampleGenerator::new(&fs, cache, &args.mounted_base)
        .with_eager_mounts(eager_mounts)
        .with_template(args.template);

    let sets = generator.generate(source.lines());
    generator
        .into_cache()
        .save()
        .context("Failed to save reachability cache")?;

    write_checks(&args.gen_checks, &sets)?;

    tracing::info!(
        checks = sets.len(),
        cached,
        globs = fs.globs(),
        template = args.template,
        "Generated reachability checks"
    );
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    let mut source = String::new();
    if path == Path::new("-") {
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read rules from stdin")?;
    } else {
        source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule source {}", path.display()))?;
    }
    Ok(source)
}

fn write_checks(path: &Path, sets: &[ReachabilityCheckSet]) -> Result<()> {
    if path == Path::new("-") {
        let stdout = io::stdout();
        ReachabilityCheckSet::write_all(stdout.lock(), sets)?;
        writeln!(io::stdout())?;
    } else {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        ReachabilityCheckSet::write_all(BufWriter::new(file), sets)
            .with_context(|| format!("Failed to write checks to {}", path.display()))?;
    }
    Ok(())
}

//! File reachability checks derived from AppArmor-style profiles.
//!
//! Generation reads the file rules of a profile, expands each rule glob
//! against a mounted base image and records a small set of sample paths per
//! rule. Checking later replays those samples inside a sandbox by opening
//! each one, reporting anything that cannot be reached.
//!
//! # Example
//!
//! ```no_run
//! use filereach_core::{CacheStore, Checker, HostFs, SampleGenerator};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = std::fs::read_to_string("snap.test.app.apparmor")?;
//!
//!     let cache = CacheStore::load("file_reachability.cache")?;
//!     let mut generator = SampleGenerator::new(HostFs, cache, "/snap/core22/current");
//!     let sets = generator.generate(profile.lines());
//!     generator.into_cache().save()?;
//!
//!     for failure in Checker::new(HostFs).check_all(&sets) {
//!         println!("{failure}");
//!     }
//!     Ok(())
//! }
//! ```

mod base;
mod cache;
mod checker;
mod checkset;
mod error;
mod fs;
mod mounts;
mod rules;
mod sampler;
mod variants;

pub use base::{validate_mounted_base, BASE_MARKER, BASE_USR_DIR};
pub use cache::{cache_key, CacheEntry, CacheStore, DEFAULT_CACHE_FILE};
pub use checker::{Checker, ProbeFailure};
pub use checkset::{is_single_dir, ReachabilityCheckSet, SampleMap, DIR_MARKER};
pub use error::{ReachError, Result};
pub use fs::{CountingFs, Filesystem, HostFs};
pub use mounts::{EagerMounts, EAGER_BIND_MOUNTS};
pub use rules::{extract_rules, Rule, Rules};
pub use sampler::SampleGenerator;
pub use variants::explode_variants;

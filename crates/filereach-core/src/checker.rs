//! Replays generated samples as open attempts.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::checkset::{ReachabilityCheckSet, SampleMap, DIR_MARKER};
use crate::fs::Filesystem;

/// A sampled path that could not be opened.
#[derive(Debug)]
pub struct ProbeFailure {
    /// The path that was opened.
    pub path: PathBuf,
    /// Why the open failed.
    pub error: io::Error,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Opens every sample of a check set and collects the failures.
///
/// Failures never stop the run: the point is to surface every broken
/// reachability claim in one pass.
pub struct Checker<F> {
    fs: F,
}

impl<F: Filesystem> Checker<F> {
    /// Create a checker probing through `fs`.
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Probe one check set. Write-only sets are not probed at all.
    pub fn check(&self, set: &ReachabilityCheckSet) -> Vec<ProbeFailure> {
        if set.write_only {
            // TODO: probe write-only grants once there is a side-effect free way to do it
            return Vec::new();
        }

        let mut failures = Vec::new();
        for samples in set.samples.values().chain(set.dir_samples.values()) {
            self.check_samples(samples, &mut failures);
        }
        failures
    }

    /// Probe every set, in order.
    pub fn check_all<'a, I>(&self, sets: I) -> Vec<ProbeFailure>
    where
        I: IntoIterator<Item = &'a ReachabilityCheckSet>,
    {
        sets.into_iter().flat_map(|set| self.check(set)).collect()
    }

    fn check_samples(&self, samples: &SampleMap, failures: &mut Vec<ProbeFailure>) {
        for (dir, names) in samples {
            for name in names {
                let directory = name == DIR_MARKER;
                let path = if directory {
                    PathBuf::from(dir)
                } else {
                    Path::new(dir).join(name)
                };

                if let Err(error) = self.fs.open(&path, directory) {
                    tracing::debug!(path = %path.display(), error = %error, "Probe failed");
                    failures.push(ProbeFailure { path, error });
                }
            }
        }
    }
}

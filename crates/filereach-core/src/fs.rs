//! Filesystem access used by sample generation and checking.
//!
//! Everything that touches the disk goes through [`Filesystem`] so callers can
//! observe or substitute it. [`HostFs`] is the real implementation and
//! [`CountingFs`] wraps any implementation to count calls.

use std::cell::Cell;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use glob::MatchOptions;

use crate::error::{ReachError, Result};

/// Blocking filesystem operations needed to derive and replay samples.
pub trait Filesystem {
    /// Expand a glob pattern into the matching paths, in a stable order.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Whether `path` is a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether `path` exists, following symlinks.
    fn exists(&self, path: &Path) -> bool;

    /// Open `path` read-only and close it again.
    ///
    /// With `directory` set the open fails unless `path` is a directory.
    fn open(&self, path: &Path, directory: bool) -> io::Result<()>;
}

/// The live filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl HostFs {
    const MATCH_OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    fn glob_into(pattern: &str, matches: &mut Vec<PathBuf>) -> Result<()> {
        let paths = glob::glob_with(pattern, Self::MATCH_OPTIONS).map_err(|e| {
            ReachError::Pattern {
                pattern: pattern.to_string(),
                message: e.msg.to_string(),
            }
        })?;

        for entry in paths {
            match entry {
                Ok(path) => matches.push(path),
                Err(e) => tracing::debug!(error = %e, "Skipping unreadable glob entry"),
            }
        }
        Ok(())
    }
}

impl Filesystem for HostFs {
    /// A trailing `/**` matches the directory and everything below it,
    /// files included.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let mut matches = Vec::new();
        Self::glob_into(pattern, &mut matches)?;

        // the glob crate only yields directories for a trailing `**`
        if pattern.ends_with("/**") {
            Self::glob_into(&format!("{pattern}/*"), &mut matches)?;
            matches.sort();
            matches.dedup();
        }
        Ok(matches)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open(&self, path: &Path, directory: bool) -> io::Result<()> {
        if directory {
            // opendir(3) fails with ENOTDIR on anything but a directory
            std::fs::read_dir(path).map(drop)
        } else {
            File::open(path).map(drop)
        }
    }
}

/// Wraps a [`Filesystem`] and counts the calls made through it.
#[derive(Debug, Default)]
pub struct CountingFs<F> {
    inner: F,
    globs: Cell<usize>,
    stats: Cell<usize>,
    opens: Cell<usize>,
}

impl<F: Filesystem> CountingFs<F> {
    /// Wrap `inner`.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            globs: Cell::new(0),
            stats: Cell::new(0),
            opens: Cell::new(0),
        }
    }

    /// Number of glob expansions performed.
    pub fn globs(&self) -> usize {
        self.globs.get()
    }

    /// Number of `is_dir`/`exists` lookups performed.
    pub fn stats(&self) -> usize {
        self.stats.get()
    }

    /// Number of open attempts performed.
    pub fn opens(&self) -> usize {
        self.opens.get()
    }
}

impl<F: Filesystem> Filesystem for CountingFs<F> {
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        self.globs.set(self.globs.get() + 1);
        self.inner.glob(pattern)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.stats.set(self.stats.get() + 1);
        self.inner.is_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.stats.set(self.stats.get() + 1);
        self.inner.exists(path)
    }

    fn open(&self, path: &Path, directory: bool) -> io::Result<()> {
        self.opens.set(self.opens.get() + 1);
        self.inner.open(path, directory)
    }
}

impl<F: Filesystem + ?Sized> Filesystem for &F {
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        (**self).glob(pattern)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn open(&self, path: &Path, directory: bool) -> io::Result<()> {
        (**self).open(path, directory)
    }
}

//! Persistent cache of sample derivations keyed by variant glob.
//!
//! The store is a single JSON object loaded once before generation and
//! written back once after it. There is no locking and no expiry: the file
//! must be removed whenever the filesystem it was derived from changes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checkset::SampleMap;
use crate::error::{ReachError, Result};

/// Default cache location, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "file_reachability.cache";

/// Key prefix separating write-only derivations from read-capable ones.
const WRITE_ONLY_PREFIX: &str = "wo:";

/// Build the cache key for a variant under the given access mode.
pub fn cache_key(variant: &str, write_only: bool) -> String {
    if write_only {
        format!("{WRITE_ONLY_PREFIX}{variant}")
    } else {
        variant.to_string()
    }
}

/// A cached derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Samples derived for the key.
    pub samples: SampleMap,

    /// Derived in template-capture mode; not replayed in normal runs.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub template: bool,
}

/// In-memory view of the cache file.
#[derive(Debug, Default)]
pub struct CacheStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheStore {
    /// A cache that is never read from or written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache at `path`.
    ///
    /// A missing file yields an empty cache. So does a file that cannot be
    /// parsed, since the cache only ever saves time.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable reachability cache"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(ReachError::Cache { path, source }),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded cache");
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Where the cache is persisted, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a derivation.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Add or replace a derivation.
    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Number of cached derivations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no derivations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the whole cache file.
    ///
    /// The new contents are written next to the target and renamed over it,
    /// so an interrupted save leaves the previous cache intact.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ReachError::Cache {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let contents = serde_json::to_string(&self.entries)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents).map_err(|source| ReachError::Cache {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| ReachError::Cache {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), entries = self.entries.len(), "Saved cache");
        Ok(())
    }
}

//! Configuration types.
//!
//! ```toml
//! [cache]
//! path = "file_reachability.cache"
//! enabled = true
//!
//! [mounts]
//! extra_eager = ["/snap"]
//!
//! [logging]
//! dir = "/var/log/filereach"
//! ```

use std::path::PathBuf;

use serde::Deserialize;

/// Default cache file, relative to the working directory.
pub const DEFAULT_CACHE_PATH: &str = "file_reachability.cache";

/// Environment variable overriding `cache.path`.
pub const CACHE_PATH_ENV: &str = "FILEREACH_CACHE_PATH";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilereachConfig {
    /// Derivation cache settings.
    pub cache: CacheConfig,
    /// Eager bind mount settings.
    pub mounts: MountsConfig,
    /// Log sink settings.
    pub logging: LoggingConfig,
}

impl FilereachConfig {
    /// Create a config with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge a layer parsed from another file on top of this one.
    ///
    /// Only fields the layer actually sets take priority; extra eager mounts
    /// accumulate.
    pub fn merge(&mut self, other: RawConfig) {
        if let Some(cache) = other.cache {
            if let Some(path) = cache.path {
                self.cache.path = path;
            }
            if let Some(enabled) = cache.enabled {
                self.cache.enabled = enabled;
            }
        }
        if let Some(mounts) = other.mounts {
            for prefix in mounts.extra_eager {
                if !self.mounts.extra_eager.contains(&prefix) {
                    self.mounts.extra_eager.push(prefix);
                }
            }
        }
        if let Some(logging) = other.logging
            && logging.dir.is_some()
        {
            self.logging.dir = logging.dir;
        }
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(CACHE_PATH_ENV)
            && !path.is_empty()
        {
            self.cache.path = PathBuf::from(path);
        }
    }
}

/// Derivation cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file location. Relative paths resolve against the working directory.
    pub path: PathBuf,
    /// Whether to read and write the cache at all.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_PATH),
            enabled: true,
        }
    }
}

/// Eager bind mount settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MountsConfig {
    /// Prefixes mounted from the host in addition to the built-in set.
    pub extra_eager: Vec<String>,
}

/// Log sink settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling JSON logs. Console logging is always on.
    pub dir: Option<PathBuf>,
}

/// A single config file as written, with unset fields left as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub cache: Option<RawCacheConfig>,
    pub mounts: Option<MountsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCacheConfig {
    pub path: Option<PathBuf>,
    pub enabled: Option<bool>,
}

impl RawConfig {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FilereachConfig::default();
        assert_eq!(config.cache.path, PathBuf::from("file_reachability.cache"));
        assert!(config.cache.enabled);
        assert!(config.mounts.extra_eager.is_empty());
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_parse_full() {
        let config = FilereachConfig::from_toml(
            r#"
[cache]
path = "/var/cache/reach.json"
enabled = false

[mounts]
extra_eager = ["/snap", "/writable"]

[logging]
dir = "/tmp/logs"
"#,
        )
        .unwrap();
        assert_eq!(config.cache.path, PathBuf::from("/var/cache/reach.json"));
        assert!(!config.cache.enabled);
        assert_eq!(config.mounts.extra_eager, vec!["/snap", "/writable"]);
        assert_eq!(config.logging.dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_parse_partial_keeps_defaults() {
        let config = FilereachConfig::from_toml("[cache]\nenabled = false\n").unwrap();
        assert_eq!(config.cache.path, PathBuf::from(DEFAULT_CACHE_PATH));
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_merge_only_overrides_set_fields() {
        let mut config = FilereachConfig::default();
        config.merge(RawConfig::from_toml("[cache]\npath = \"a.cache\"\n[mounts]\nextra_eager = [\"/snap\"]\n").unwrap());
        config.merge(RawConfig::from_toml("[cache]\nenabled = false\n[mounts]\nextra_eager = [\"/snap\", \"/opt\"]\n").unwrap());

        assert_eq!(config.cache.path, PathBuf::from("a.cache"));
        assert!(!config.cache.enabled);
        assert_eq!(config.mounts.extra_eager, vec!["/snap", "/opt"]);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(FilereachConfig::from_toml("[cache\npath =").is_err());
    }
}

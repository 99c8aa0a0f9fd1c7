//! Paths that the sandbox bind-mounts from the host before the profile applies.
//!
//! Anything under one of these prefixes is reachable by construction, so no
//! samples are derived for it.

use std::collections::HashSet;

/// Directories (or symlinks to directories) mounted eagerly from the host.
pub const EAGER_BIND_MOUNTS: &[&str] = &[
    "/dev",
    "/etc",
    "/home",
    "/root",
    "/sys",
    "/tmp",
    "/var/snap",
    "/var/lib/snapd",
    "/var/tmp",
    "/run",
    "/var/run",
    "/lib/modules",
    "/usr/src",
    "/var/log",
    "/media",
    "/mnt",
    "/var/lib/extrausers",
];

/// Set of eager-mount prefixes, one to three path segments deep.
#[derive(Debug, Clone)]
pub struct EagerMounts {
    prefixes: HashSet<String>,
}

impl Default for EagerMounts {
    fn default() -> Self {
        Self {
            prefixes: EAGER_BIND_MOUNTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl EagerMounts {
    /// Create the built-in set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add further prefixes on top of the built-in set.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for prefix in extra {
            let prefix = prefix.into();
            let trimmed = prefix.trim_end_matches('/');
            if !trimmed.is_empty() {
                self.prefixes.insert(trimmed.to_string());
            }
        }
        self
    }

    /// Whether `path` lies under one of the eager-mount prefixes.
    ///
    /// Only the first one to three segments are compared, so `/var/lib/snapd/x`
    /// matches but a prefix four segments deep would never be consulted.
    pub fn contains(&self, path: &str) -> bool {
        let segs: Vec<&str> = path.split('/').collect();
        (2..=4).any(|n| {
            let prefix = segs[..n.min(segs.len())].join("/");
            self.prefixes.contains(&prefix)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_prefixes_match() {
        let mounts = EagerMounts::new();
        assert!(mounts.contains("/etc/foo/bar"));
        assert!(mounts.contains("/etc"));
        assert!(mounts.contains("/dev/null"));
        assert!(mounts.contains("/var/lib/snapd/seed/x"));
        assert!(mounts.contains("/lib/modules/6.1/kernel"));
        assert!(mounts.contains("/var/lib/extrausers/passwd"));
    }

    #[test]
    fn test_other_paths_do_not_match() {
        let mounts = EagerMounts::new();
        assert!(!mounts.contains("/opt/custom"));
        assert!(!mounts.contains("/usr/lib/x"));
        assert!(!mounts.contains("/var/lib/dpkg/status"));
        assert!(!mounts.contains("/etcetera"));
        assert!(!mounts.contains("/"));
    }

    #[test]
    fn test_extra_prefixes() {
        let mounts = EagerMounts::new().with_extra(["/snap/", "/opt/vendor"]);
        assert!(mounts.contains("/snap/core/current"));
        assert!(mounts.contains("/opt/vendor/lib"));
        assert!(!mounts.contains("/opt/other"));
    }
}

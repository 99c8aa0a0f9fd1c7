//! Derivation of sample sets from rule globs.
//!
//! Each variant glob is expanded against the filesystem and the matches are
//! reduced to a handful of witnesses per directory: every matched directory
//! is opened as itself, and for read rules at most one file per directory is
//! kept. Results are cached per variant so repeat runs never glob again.

use std::path::{Path, PathBuf};

use crate::cache::{cache_key, CacheEntry, CacheStore};
use crate::checkset::{is_single_dir, ReachabilityCheckSet, SampleMap, DIR_MARKER};
use crate::fs::Filesystem;
use crate::mounts::EagerMounts;
use crate::rules::{extract_rules, Rule};
use crate::variants::explode_variants;

/// Variant too general to derive a precise check for.
const MATCH_EVERYTHING: &str = "/**";

/// Generates reachability check sets for the rules of a profile.
///
/// Owns the cache for the duration of one generation run; take it back with
/// [`SampleGenerator::into_cache`] to save it.
pub struct SampleGenerator<F> {
    fs: F,
    cache: CacheStore,
    mounted_base: PathBuf,
    eager_mounts: EagerMounts,
    template: bool,
}

impl<F: Filesystem> SampleGenerator<F> {
    /// Create a generator that resolves base-image paths under `mounted_base`.
    ///
    /// A relative base is made absolute, and `.` components are dropped, so
    /// that glob matches can be mapped back under it.
    pub fn new(fs: F, cache: CacheStore, mounted_base: impl Into<PathBuf>) -> Self {
        let mounted_base = mounted_base.into();
        let mounted_base = std::path::absolute(&mounted_base).unwrap_or(mounted_base);
        Self {
            fs,
            cache,
            mounted_base,
            eager_mounts: EagerMounts::default(),
            template: false,
        }
    }

    /// Replace the set of eagerly bind-mounted prefixes.
    pub fn with_eager_mounts(mut self, eager_mounts: EagerMounts) -> Self {
        self.eager_mounts = eager_mounts;
        self
    }

    /// Capture template rules. Derivations are cached with a template marker.
    pub fn with_template(mut self, template: bool) -> Self {
        self.template = template;
        self
    }

    /// The cache as it stands.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Give back the cache, typically to save it.
    pub fn into_cache(self) -> CacheStore {
        self.cache
    }

    /// Derive check sets for every file rule in the profile source.
    ///
    /// Rules using `@{...}` variables are skipped, as are rules whose variants
    /// are all eagerly mounted or that matched nothing.
    pub fn generate<I, S>(&mut self, lines: I) -> Vec<ReachabilityCheckSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sets = Vec::new();
        for line in extract_rules(lines) {
            if line.contains("@{") {
                tracing::debug!(rule = %line, "Skipping rule with variables");
                continue;
            }
            let Some(rule) = Rule::parse(&line) else {
                continue;
            };
            if let Some(set) = self.check_set_for_rule(&rule) {
                sets.push(set);
            }
        }
        sets
    }

    /// Derive the check set for one rule, if it has anything to check.
    pub fn check_set_for_rule(&mut self, rule: &Rule) -> Option<ReachabilityCheckSet> {
        let variants: Vec<String> = explode_variants(&rule.glob)
            .filter(|v| v != MATCH_EVERYTHING && !self.eager_mounts.contains(v))
            .collect();
        if variants.is_empty() {
            return None;
        }

        let set = self.derive_check_set(&rule.glob, variants, rule.is_write_only());
        (!set.is_empty()).then_some(set)
    }

    /// Collect samples for each variant and report suspicious results.
    pub fn derive_check_set(
        &mut self,
        glob: &str,
        variants: Vec<String>,
        write_only: bool,
    ) -> ReachabilityCheckSet {
        let mut set = ReachabilityCheckSet::new(Vec::new(), write_only);
        let mut expected_samples = false;
        let mut expected_dir_samples = false;

        for variant in &variants {
            let key = cache_key(variant, write_only);
            if !self.template && self.cache.get(&key).is_some_and(|e| e.template) {
                tracing::debug!(variant = %variant, "Skipping template-only derivation");
                continue;
            }

            let acc = if variant.ends_with('/') {
                expected_dir_samples = true;
                &mut set.dir_samples
            } else {
                expected_samples = true;
                &mut set.samples
            };
            if acc.contains_key(variant) {
                continue;
            }

            let samples = self.samples_for(variant, write_only);
            if !samples.is_empty() {
                acc.insert(variant.clone(), samples);
            }
        }
        set.variants = variants;

        if expected_samples && set.samples.is_empty() {
            tracing::warn!("no samples for {glob}");
        } else if expected_dir_samples && set.dir_samples.is_empty() {
            tracing::warn!("no dir samples for {glob}");
        }
        for (variant, samples) in &set.samples {
            if is_single_dir(samples) {
                tracing::warn!("only 1 dir for {variant}");
            }
        }

        set
    }

    /// Samples for one variant, from the cache or from the filesystem.
    pub fn samples_for(&mut self, variant: &str, write_only: bool) -> SampleMap {
        let key = cache_key(variant, write_only);
        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(key = %key, "Cache hit");
            return entry.samples.clone();
        }

        let samples = self.expand(variant, write_only);
        tracing::debug!(key = %key, dirs = samples.len(), "Derived samples");
        self.cache.insert(
            key,
            CacheEntry {
                samples: samples.clone(),
                template: self.template,
            },
        );
        samples
    }

    /// Expand `variant` on disk and reduce the matches to samples.
    fn expand(&self, variant: &str, write_only: bool) -> SampleMap {
        let dir_only = variant.ends_with('/') && variant != "/";
        let from_base = resolves_in_base(variant);

        let rule_path = if dir_only {
            variant.trim_end_matches('/')
        } else {
            variant
        };
        let pattern = if from_base {
            format!(
                "{}/{}",
                glob::Pattern::escape(self.mounted_base.to_string_lossy().trim_end_matches('/')),
                rule_path.trim_start_matches('/')
            )
        } else {
            rule_path.to_string()
        };
        let pattern = fold_partial_recursion(&pattern);

        let mut matches = match self.fs.glob(&pattern) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(variant = %variant, error = %e, "Cannot expand glob");
                return SampleMap::new();
            }
        };

        // `<dir>/**` also matches `<dir>` itself; that needs its own rule.
        if let Some(top) = variant.strip_suffix("/**") {
            let top = self.on_disk(top, from_base);
            matches.retain(|m| m != &top);
        }

        let mut samples = SampleMap::new();
        let mut files = Vec::new();
        for found in &matches {
            let path = self.rule_frame(found, from_base);
            if self.fs.is_dir(found) {
                samples.insert(path, vec![DIR_MARKER.to_string()]);
            } else if !dir_only && self.fs.exists(found) {
                files.push(path);
            }
        }

        for path in files {
            let (dir, name) = split_parent(&path);
            let names = samples.entry(dir.to_string()).or_default();
            if !write_only {
                let marker = usize::from(names.first().is_some_and(|n| n == DIR_MARKER));
                if names.len() > marker {
                    continue;
                }
            }
            names.push(name.to_string());
        }

        samples
    }

    /// Where a rule path lives on the filesystem being sampled.
    fn on_disk(&self, rule_path: &str, from_base: bool) -> PathBuf {
        if from_base {
            self.mounted_base.join(rule_path.trim_start_matches('/'))
        } else {
            PathBuf::from(rule_path)
        }
    }

    /// Map a filesystem match back to the path the rule talks about.
    fn rule_frame(&self, found: &Path, from_base: bool) -> String {
        let path = if from_base {
            let rel = found.strip_prefix(&self.mounted_base).unwrap_or(found);
            format!("/{}", rel.to_string_lossy().trim_start_matches('/'))
        } else {
            found.to_string_lossy().into_owned()
        };

        if path == "/" {
            path
        } else {
            path.trim_end_matches('/').to_string()
        }
    }
}

/// Paths provided by the base image rather than the host.
fn resolves_in_base(variant: &str) -> bool {
    variant.contains("/bin") || variant.contains("/sbin") || variant.starts_with("/usr")
}

/// Treat `**` inside a larger path component (`/usr/lib/**.so`) as `*`.
///
/// AppArmor allows it but glob patterns only recurse on a bare `**` segment.
fn fold_partial_recursion(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|seg| {
            if seg == "**" || !seg.contains("**") {
                seg.to_string()
            } else {
                let mut folded = seg.to_string();
                while folded.contains("**") {
                    folded = folded.replace("**", "*");
                }
                folded
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Split `/a/b/c` into `("/a/b", "c")` and `/c` into `("/", "c")`.
fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{CountingFs, HostFs};
    use std::fs;
    use tempfile::TempDir;

    /// A fake base image plus a host tree, both under one temp dir.
    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();

            let base = root.join("base");
            fs::create_dir_all(base.join("meta")).unwrap();
            fs::write(base.join("meta/snap.yaml"), "name: core\n").unwrap();
            fs::create_dir_all(base.join("usr/lib/foo/plugins")).unwrap();
            for name in ["a", "b", "c"] {
                fs::write(base.join("usr/lib/foo").join(name), name).unwrap();
            }
            fs::write(base.join("usr/lib/foo/plugins/p.so"), "p").unwrap();
            fs::create_dir_all(base.join("usr/share/empty")).unwrap();
            fs::create_dir_all(base.join("bin")).unwrap();
            fs::write(base.join("bin/sh"), "sh").unwrap();

            let host = root.join("host");
            fs::create_dir_all(host.join("data/sub")).unwrap();
            fs::write(host.join("data/one"), "1").unwrap();
            fs::write(host.join("data/sub/two"), "2").unwrap();

            Self { dir }
        }

        fn base(&self) -> PathBuf {
            self.dir.path().join("base")
        }

        fn host(&self, rel: &str) -> String {
            format!("{}/{}", self.dir.path().join("host").display(), rel)
        }

        fn generator<F: Filesystem>(&self, fs: F, cache: CacheStore) -> SampleGenerator<F> {
            SampleGenerator::new(fs, cache, self.base())
        }
    }

    #[test]
    fn test_read_rule_keeps_one_file_per_dir() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let samples = generator.samples_for("/usr/lib/foo/*", false);
        let files: Vec<_> = samples["/usr/lib/foo"].iter().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0], "a");
        assert_eq!(samples["/usr/lib/foo/plugins"], vec!["."]);
    }

    #[test]
    fn test_write_only_rule_keeps_all_files() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let samples = generator.samples_for("/usr/lib/foo/*", true);
        assert_eq!(samples["/usr/lib/foo"], vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dir_only_variant() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let samples = generator.samples_for("/usr/lib/foo/*/", false);
        assert_eq!(
            samples,
            SampleMap::from([("/usr/lib/foo/plugins".to_string(), vec![".".to_string()])])
        );
    }

    #[test]
    fn test_recursive_drops_top_directory() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let samples = generator.samples_for("/usr/lib/foo/**", false);
        assert!(!samples.contains_key("/usr/lib"));
        assert!(!samples.get("/usr/lib/foo").is_some_and(|n| n.contains(&".".to_string())));
        assert_eq!(samples["/usr/lib/foo/plugins"], vec![".", "p.so"]);
    }

    #[test]
    fn test_host_paths_not_rebased() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let variant = fx.host("data/*");
        let samples = generator.samples_for(&variant, false);
        assert_eq!(samples[&fx.host("data")], vec!["one"]);
        assert_eq!(samples[&fx.host("data/sub")], vec!["."]);
    }

    #[test]
    fn test_base_with_dot_components() {
        let fx = Fixture::new();
        let base = fx.dir.path().join(".").join("base").join(".");
        let mut generator = SampleGenerator::new(HostFs, CacheStore::in_memory(), base);

        let samples = generator.samples_for("/usr/lib/foo/**", false);
        assert_eq!(samples["/usr/lib/foo"], vec!["a"]);
        assert_eq!(samples["/usr/lib/foo/plugins"], vec![".", "p.so"]);
        assert!(samples.keys().all(|dir| dir.starts_with("/usr/lib/foo")));
    }

    #[test]
    fn test_check_set_for_rule() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let rule = Rule::parse("/usr/{lib/foo/*,share/empty/} r,").unwrap();
        let set = generator.check_set_for_rule(&rule).unwrap();
        assert_eq!(set.variants, vec!["/usr/lib/foo/*", "/usr/share/empty/"]);
        assert!(!set.write_only);
        assert!(set.samples.contains_key("/usr/lib/foo/*"));
        assert_eq!(
            set.dir_samples["/usr/share/empty/"],
            SampleMap::from([("/usr/share/empty".to_string(), vec![".".to_string()])])
        );
    }

    #[test]
    fn test_eager_mounts_and_catch_all_skipped() {
        let fx = Fixture::new();
        let fs = CountingFs::new(HostFs);
        let mut generator = fx.generator(&fs, CacheStore::in_memory());

        assert!(generator.check_set_for_rule(&Rule::parse("/etc/{a,b}/** r,").unwrap()).is_none());
        assert!(generator.check_set_for_rule(&Rule::parse("/** r,").unwrap()).is_none());
        assert_eq!(fs.globs(), 0);
    }

    #[test]
    fn test_rule_matching_nothing_is_dropped() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let rule = Rule::parse("/usr/lib/nothing-here/* r,").unwrap();
        assert!(generator.check_set_for_rule(&rule).is_none());
    }

    #[test]
    fn test_generate_from_profile() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        let profile = "\
profile test {
  /usr/lib/foo/* r,
  /usr/lib/@{arch}/* r,
  /bin/sh ix,
  /bin/sh r,
  profile inner {
    /usr/lib/foo/plugins/* r,
  }
}
";
        let sets = generator.generate(profile.lines());
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].variants, vec!["/usr/lib/foo/*"]);
        assert_eq!(sets[1].samples["/bin/sh"]["/bin"], vec!["sh"]);
    }

    #[test]
    fn test_second_run_uses_cache_only() {
        let fx = Fixture::new();
        let cache_path = fx.dir.path().join("reach.cache");
        let profile = "profile p {\n  /usr/lib/foo/** r,\n  /usr/share/*/ r,\n  /bin/* w,\n}\n";

        let first_fs = CountingFs::new(HostFs);
        let mut generator = fx.generator(&first_fs, CacheStore::load(&cache_path).unwrap());
        let first = generator.generate(profile.lines());
        generator.into_cache().save().unwrap();
        assert_eq!(first_fs.globs(), 3);

        let second_fs = CountingFs::new(HostFs);
        let mut generator = fx.generator(&second_fs, CacheStore::load(&cache_path).unwrap());
        let second = generator.generate(profile.lines());
        assert_eq!(second_fs.globs(), 0);
        assert_eq!(second_fs.stats(), 0);

        let mut a = Vec::new();
        let mut b = Vec::new();
        ReachabilityCheckSet::write_all(&mut a, &first).unwrap();
        ReachabilityCheckSet::write_all(&mut b, &second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_template_derivations_not_replayed_in_normal_mode() {
        let fx = Fixture::new();
        let rule = Rule::parse("/usr/lib/foo/* r,").unwrap();

        let mut generator = fx
            .generator(HostFs, CacheStore::in_memory())
            .with_template(true);
        assert!(generator.check_set_for_rule(&rule).is_some());
        assert!(generator.cache().get("/usr/lib/foo/*").unwrap().template);

        let cache = generator.into_cache();
        let mut generator = fx.generator(HostFs, cache);
        assert!(generator.check_set_for_rule(&rule).is_none());

        let cache = generator.into_cache();
        let mut generator = fx.generator(HostFs, cache).with_template(true);
        assert!(generator.check_set_for_rule(&rule).is_some());
    }

    #[test]
    fn test_write_only_cached_separately() {
        let fx = Fixture::new();
        let mut generator = fx.generator(HostFs, CacheStore::in_memory());

        generator.samples_for("/usr/lib/foo/*", false);
        generator.samples_for("/usr/lib/foo/*", true);
        assert!(generator.cache().get("/usr/lib/foo/*").is_some());
        assert!(generator.cache().get("wo:/usr/lib/foo/*").is_some());
    }

    #[test]
    fn test_fold_partial_recursion() {
        assert_eq!(fold_partial_recursion("/usr/lib/**.so"), "/usr/lib/*.so");
        assert_eq!(fold_partial_recursion("/usr/lib/**"), "/usr/lib/**");
        assert_eq!(fold_partial_recursion("/a/***/b"), "/a/*/b");
    }

    #[test]
    fn test_split_parent() {
        assert_eq!(split_parent("/a/b/c"), ("/a/b", "c"));
        assert_eq!(split_parent("/c"), ("/", "c"));
    }

    #[test]
    fn test_resolves_in_base() {
        assert!(resolves_in_base("/usr/share/x"));
        assert!(resolves_in_base("/bin/sh"));
        assert!(resolves_in_base("/sbin/init"));
        assert!(!resolves_in_base("/opt/thing"));
        assert!(!resolves_in_base("/var/lib/x"));
    }
}

//! Extraction of path-glob rules from AppArmor profile text.
//!
//! This is a lexical scan, not a parser. It tracks how many `profile` blocks
//! are open and only looks for rules directly inside the outermost one.
//! Rules split over several lines or with commas inside the path are missed.

use std::sync::LazyLock;

use regex::Regex;

/// Plain file rule granting `r` and/or `w`, skipping `//` comment lines.
static RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*/(?:[^/ ][^ ]*)? [^#]*[rw][^#]*,").expect("rule regex is valid")
});

static PROFILE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*profile\s").expect("profile regex is valid"));

static PROFILE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\}").expect("profile end regex is valid"));

/// A single file rule, e.g. `/usr/share/fonts/** rk,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Path glob, possibly containing brace groups.
    pub glob: String,
    /// Access qualifiers as written (`r`, `rw,`, `mrwk,` ...).
    pub access: String,
}

impl Rule {
    /// Split an extracted rule line into glob and access qualifiers.
    ///
    /// Tokens after the access qualifiers (such as `-> target`) are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let glob = tokens.next()?;
        let access = tokens.next()?;
        Some(Self {
            glob: glob.to_string(),
            access: access.to_string(),
        })
    }

    /// Rules without read permission are recorded but never probed.
    pub fn is_write_only(&self) -> bool {
        !self.access.contains('r')
    }
}

/// Nesting state of the profile scanner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ProfileDepth(i32);

impl ProfileDepth {
    /// Apply one line. Returns `true` if the line was a block transition.
    fn advance(&mut self, line: &str) -> bool {
        if PROFILE_START_RE.is_match(line) {
            self.0 += 1;
            true
        } else if PROFILE_END_RE.is_match(line) {
            self.0 -= 1;
            true
        } else {
            false
        }
    }

    fn in_profile(&self) -> bool {
        self.0 == 1
    }
}

/// Lazy iterator over trimmed rule strings. See [`extract_rules`].
pub struct Rules<I> {
    lines: I,
    depth: ProfileDepth,
}

impl<I, S> Iterator for Rules<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for line in self.lines.by_ref() {
            let line = line.as_ref();
            if self.depth.advance(line) || !self.depth.in_profile() {
                continue;
            }
            if let Some(m) = RULE_RE.find(line) {
                return Some(m.as_str().trim().to_string());
            }
        }
        None
    }
}

/// Scan profile source lines and yield the file rules found at depth one.
///
/// A line starting with `profile ` opens a block and a line starting with `}`
/// closes one. Rules at top level or inside nested profiles are skipped.
pub fn extract_rules<I, S>(lines: I) -> Rules<I::IntoIter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Rules {
        lines: lines.into_iter(),
        depth: ProfileDepth::default(),
    }
}

//! The serialized unit of work: all samples derived for one rule glob.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Entry name meaning "open the directory itself".
pub const DIR_MARKER: &str = ".";

/// Directory path to the entry names inside it that should be probed.
pub type SampleMap = BTreeMap<String, Vec<String>>;

/// Checks derived for one rule glob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityCheckSet {
    /// Brace-expanded variants of the rule glob, in expansion order.
    pub variants: Vec<String>,

    /// The rule lacks read permission. Such sets are never probed.
    #[serde(rename = "write-only", default)]
    pub write_only: bool,

    /// Samples for variants that match files (and directories).
    pub samples: BTreeMap<String, SampleMap>,

    /// Samples for directory-only variants (those ending in `/`).
    #[serde(rename = "dir-samples")]
    pub dir_samples: BTreeMap<String, SampleMap>,
}

impl ReachabilityCheckSet {
    /// Create an empty set for the given variants.
    pub fn new(variants: Vec<String>, write_only: bool) -> Self {
        Self {
            variants,
            write_only,
            ..Default::default()
        }
    }

    /// A set with no samples checks nothing and is left out of the output.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.dir_samples.is_empty()
    }

    /// Read a JSON array of check sets.
    pub fn read_all<R: Read>(reader: R) -> Result<Vec<Self>> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write check sets as a single JSON array.
    pub fn write_all<W: Write>(mut writer: W, sets: &[Self]) -> Result<()> {
        serde_json::to_writer(&mut writer, sets)?;
        writer.flush()?;
        Ok(())
    }
}

/// Whether a sample map degenerated to a single directory opened as itself.
pub fn is_single_dir(samples: &SampleMap) -> bool {
    samples.len() == 1
        && samples
            .values()
            .all(|names| names.len() == 1 && names[0] == DIR_MARKER)
}

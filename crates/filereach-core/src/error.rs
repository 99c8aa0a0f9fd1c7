//! Error types for reachability derivation and checking.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating or replaying checks.
///
/// Derivation anomalies and probe failures are not errors; they are logged
/// and processing continues. Only setup and I/O on the tool's own files fail.
#[derive(Debug, Error)]
pub enum ReachError {
    /// The mounted base image failed validation.
    #[error("{path:?} {reason}")]
    InvalidBase { path: PathBuf, reason: String },

    /// Failed to read or write the persistent cache.
    #[error("cache file '{path}': {source}")]
    Cache {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A glob pattern could not be compiled.
    #[error("invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Check-set or cache (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reachability operations.
pub type Result<T> = std::result::Result<T, ReachError>;

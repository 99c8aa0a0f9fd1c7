//! CLI command handlers.

pub mod check;
pub mod generate;

use filereach_config::FilereachConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration (files + environment).
    pub config: FilereachConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}

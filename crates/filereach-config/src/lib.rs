//! Configuration system for filereach.
//!
//! Provides TOML-based configuration with:
//! - Cache location and enablement
//! - Additional eager bind mount prefixes
//! - An optional JSON log directory
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, xdg_config_dir, xdg_config_path,
    ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;

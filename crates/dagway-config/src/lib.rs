//! Configuration system for dagway.
//!
//! Provides TOML-based configuration with:
//! - `[server]` listener settings
//! - `[auth]` token header and expected token
//! - `[orchestrator]` CLI program, metadata database and folders
//! - `[api]` response shaping and startup logging
//!
//! Config files are layered: the user config directory first, then a
//! project-local `dagway.toml`. CLI flags are applied on top by the binary.

pub mod discovery;
pub mod error;
pub mod paths;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, save_config, xdg_config_dir,
    xdg_config_path, ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use paths::expand_home;
pub use types::*;

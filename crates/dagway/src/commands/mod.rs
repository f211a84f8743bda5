//! CLI command handlers.

use std::path::PathBuf;

use anyhow::Result;
use dagway_config::LoadedConfig;

pub mod apis;
pub mod config;
pub mod start;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Overrides the user configuration directory.
    pub config_dir: Option<PathBuf>,
}

impl Context {
    /// Discover and merge configuration layers.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        Ok(dagway_config::load_config_with_options(
            None,
            self.config_dir.as_deref(),
        )?)
    }

    /// Path of the user config file.
    pub fn user_config_path(&self) -> Option<PathBuf> {
        match self.config_dir {
            Some(ref dir) => Some(dir.join("config.toml")),
            None => dagway_config::xdg_config_path(),
        }
    }
}

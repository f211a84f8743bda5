//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/dagway/config.toml` (or `$DAGWAY_CONFIG_DIR/config.toml`)
//! 2. `./dagway.toml` (project-local)
//! 3. CLI arguments and environment (handled by the binary)

use std::path::{Path, PathBuf};

use crate::{ConfigError, DagwayConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "dagway.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

const APP_NAME: &str = "dagway";

/// Environment variable to override the user config directory.
const CONFIG_DIR_ENV: &str = "DAGWAY_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: DagwayConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Problems found while loading (unreadable or malformed layers).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `DAGWAY_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = DagwayConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        let (source, layer) = load_layer(&path, &mut warnings);
        if let Some(layer) = layer {
            config.merge(layer);
        }
        sources.push(source);
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    let (source, layer) = load_layer(&project_path, &mut warnings);
    if let Some(layer) = layer {
        check_plaintext_token(&layer, &project_path, &mut warnings);
        config.merge(layer);
    }
    sources.push(source);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<DagwayConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    DagwayConfig::from_toml(&contents)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &DagwayConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory.
///
/// Checks `DAGWAY_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/dagway` on Linux).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a single config file.
///
/// Missing files are skipped silently; unreadable or malformed ones are
/// skipped with a warning.
fn load_layer(path: &Path, warnings: &mut Vec<String>) -> (ConfigSource, Option<DagwayConfig>) {
    let mut source = ConfigSource {
        path: path.to_path_buf(),
        loaded: false,
    };
    if !path.is_file() {
        return (source, None);
    }

    match load_config_file(path) {
        Ok(layer) => {
            source.loaded = true;
            (source, Some(layer))
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            (source, None)
        }
    }
}

/// Warn when the project-local file itself carries the API token.
fn check_plaintext_token(project: &DagwayConfig, path: &Path, warnings: &mut Vec<String>) {
    if project.auth().is_enabled() {
        warnings.push(format!(
            "[auth] expected_token is set in {}. \
             Consider using the DAGWAY_HTTP_TOKEN environment variable instead.",
            path.display()
        ));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

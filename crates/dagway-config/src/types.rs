//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]          # listener settings
//! [auth]            # token authentication
//! [orchestrator]    # CLI program, metadata database, folders
//! [api]             # response shaping
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::paths::expand_home;

/// Header carrying the API token unless configured otherwise.
pub const DEFAULT_TOKEN_HEADER: &str = "rest_api_plugin_http_token";

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default upper bound on request bodies (uploads included).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default orchestrator executable.
pub const DEFAULT_PROGRAM: &str = "airflow";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. A section present in a later layer
/// replaces the earlier one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagwayConfig {
    pub server: Option<ServerSection>,
    pub auth: Option<AuthSection>,
    pub orchestrator: Option<OrchestratorSection>,
    pub api: Option<ApiSection>,
}

impl DagwayConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: DagwayConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        if other.orchestrator.is_some() {
            self.orchestrator = other.orchestrator;
        }
        if other.api.is_some() {
            self.api = other.api;
        }
    }

    /// Effective `[server]` section.
    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    /// Effective `[auth]` section.
    pub fn auth(&self) -> AuthSection {
        self.auth.clone().unwrap_or_default()
    }

    /// Effective `[orchestrator]` section.
    pub fn orchestrator(&self) -> OrchestratorSection {
        self.orchestrator.clone().unwrap_or_default()
    }

    /// Effective `[api]` section.
    pub fn api(&self) -> ApiSection {
        self.api.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Socket address to bind, e.g. `127.0.0.1:8080`.
    pub bind: String,
    /// Log method, path, status and latency of each request.
    pub request_logging: bool,
    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Token authentication. Disabled when `expected_token` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub token_header: String,
    pub expected_token: Option<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            expected_token: None,
        }
    }
}

impl AuthSection {
    /// Whether requests must present a token.
    pub fn is_enabled(&self) -> bool {
        self.expected_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// Where the orchestrator lives and how to reach it.
///
/// Path fields accept a leading `~`; use the `*_path` accessors to get the
/// expanded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    /// Executable invoked for command-line operations.
    pub program: String,
    /// Shell used to launch background operations.
    pub shell: PathBuf,
    /// SQLite metadata database.
    pub metadata_db: PathBuf,
    /// Folder workflow definition files are deployed into.
    pub dags_folder: PathBuf,
    /// Folder receiving `<operation>.log` for background operations.
    pub base_log_folder: PathBuf,
    /// Base URL of the orchestrator webserver, used to refresh workflows.
    pub webserver_base_url: String,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            shell: PathBuf::from("/bin/sh"),
            metadata_db: PathBuf::from("~/airflow/airflow.db"),
            dags_folder: PathBuf::from("~/airflow/dags"),
            base_log_folder: PathBuf::from("~/airflow/logs"),
            webserver_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl OrchestratorSection {
    pub fn metadata_db_path(&self) -> PathBuf {
        expand_home(&self.metadata_db)
    }

    pub fn dags_folder_path(&self) -> PathBuf {
        expand_home(&self.dags_folder)
    }

    pub fn base_log_folder_path(&self) -> PathBuf {
        expand_home(&self.base_log_folder)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API
// ─────────────────────────────────────────────────────────────────────────────

/// Response shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Strip the orchestrator's startup log lines from command output.
    pub filter_loading_messages: bool,
    /// Log the effective configuration at startup.
    pub log_loading: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            filter_loading_messages: true,
            log_loading: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Application state shared across handlers.

use std::sync::Arc;

use dagway_dispatch::{ApiRegistry, AssemblyContext, Executor};
use dagway_metadata::MetadataStore;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
///
/// Everything here is read-only after startup except the metadata store,
/// which serializes its own access.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Operation registry.
    pub registry: Arc<ApiRegistry>,

    /// Orchestrator metadata database, also the workflow catalog.
    pub metadata: Arc<MetadataStore>,

    /// Runs assembled commands.
    pub executor: Executor,

    /// Client for calls to the orchestrator webserver.
    pub http: reqwest::Client,
}

impl AppState {
    /// Create state with the built-in registry.
    pub fn new(config: ServerConfig, metadata: MetadataStore) -> Self {
        let executor = Executor::new(config.shell.clone());
        Self {
            config: Arc::new(config),
            registry: Arc::new(ApiRegistry::builtin()),
            metadata: Arc::new(metadata),
            executor,
            http: reqwest::Client::new(),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Assembly inputs derived from configuration.
    pub fn assembly_context(&self) -> AssemblyContext<'_> {
        AssemblyContext {
            program: &self.config.program,
            log_folder: &self.config.base_log_folder,
        }
    }
}

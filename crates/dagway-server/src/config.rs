//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use dagway_config::{DEFAULT_MAX_BODY_SIZE, DEFAULT_PROGRAM, DEFAULT_TOKEN_HEADER, DagwayConfig};
use dagway_dispatch::DEFAULT_SHELL;

use crate::error::{Result, ServerError};

/// Runtime configuration, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Expected API token. `None` disables authentication.
    pub auth_token: Option<String>,

    /// Header the API token is read from.
    pub token_header: String,

    /// Enable request logging.
    pub request_logging: bool,

    /// Maximum request body size in bytes. Uploads count against it.
    pub max_body_size: usize,

    /// Orchestrator executable.
    pub program: String,

    /// Shell used for background operations.
    pub shell: PathBuf,

    /// Destination for deployed workflow files.
    pub dags_folder: PathBuf,

    /// Destination for background operation logs.
    pub base_log_folder: PathBuf,

    /// Orchestrator webserver, for refreshing workflows.
    pub webserver_base_url: String,

    /// Strip the orchestrator's startup logging from command output.
    pub filter_loading_messages: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            auth_token: None,
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            program: DEFAULT_PROGRAM.to_string(),
            shell: PathBuf::from(DEFAULT_SHELL),
            dags_folder: PathBuf::from("dags"),
            base_log_folder: PathBuf::from("logs"),
            webserver_base_url: "http://localhost:8080".to_string(),
            filter_loading_messages: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with an optional auth token.
    /// Pass `None` to disable authentication.
    pub fn new(auth_token: Option<String>) -> Self {
        Self {
            auth_token,
            ..Default::default()
        }
    }

    /// Build from loaded configuration files.
    pub fn from_config(config: &DagwayConfig) -> Result<Self> {
        let server = config.server();
        let auth = config.auth();
        let orchestrator = config.orchestrator();
        let api = config.api();

        let bind_address = server.bind.parse().map_err(|e| {
            ServerError::Config(format!("invalid bind address '{}': {}", server.bind, e))
        })?;

        Ok(Self {
            bind_address,
            auth_token: auth.expected_token.clone().filter(|t| !t.is_empty()),
            token_header: auth.token_header,
            request_logging: server.request_logging,
            max_body_size: server.max_body_size,
            dags_folder: orchestrator.dags_folder_path(),
            base_log_folder: orchestrator.base_log_folder_path(),
            program: orchestrator.program,
            shell: orchestrator.shell,
            webserver_base_url: orchestrator.webserver_base_url,
            filter_loading_messages: api.filter_loading_messages,
        })
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set or clear the expected API token.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Set the header the API token is read from.
    pub fn with_token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = header.into();
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set the maximum request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the orchestrator executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the shell used for background operations.
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set the folder deployed workflow files are written to.
    pub fn with_dags_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.dags_folder = folder.into();
        self
    }

    /// Set the folder background operation logs are written to.
    pub fn with_base_log_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.base_log_folder = folder.into();
        self
    }

    /// Set the orchestrator webserver base URL.
    pub fn with_webserver_base_url(mut self, url: impl Into<String>) -> Self {
        self.webserver_base_url = url.into();
        self
    }

    /// Enable or disable loading-message filtering.
    pub fn with_filter_loading_messages(mut self, enabled: bool) -> Self {
        self.filter_loading_messages = enabled;
        self
    }

    /// Whether API requests must present a token.
    pub fn auth_enabled(&self) -> bool {
        self.auth_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ServerConfig::new(Some("my-token".to_string()))
            .with_bind_address("0.0.0.0:9000".parse().unwrap())
            .with_token_header("x-token")
            .with_program("/opt/airflow/bin/airflow")
            .with_request_logging(false);

        assert_eq!(config.auth_token.as_deref(), Some("my-token"));
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.token_header, "x-token");
        assert_eq!(config.program, "/opt/airflow/bin/airflow");
        assert!(!config.request_logging);
        assert!(config.auth_enabled());
    }

    #[test]
    fn test_from_config() {
        let file = DagwayConfig::from_toml(
            r#"
[server]
bind = "127.0.0.1:9191"

[auth]
expected_token = "secret"

[orchestrator]
program = "/usr/bin/airflow"
dags_folder = "/srv/dags"

[api]
filter_loading_messages = false
"#,
        )
        .unwrap();

        let config = ServerConfig::from_config(&file).unwrap();
        assert_eq!(config.bind_address.port(), 9191);
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.token_header, DEFAULT_TOKEN_HEADER);
        assert_eq!(config.program, "/usr/bin/airflow");
        assert_eq!(config.dags_folder, PathBuf::from("/srv/dags"));
        assert!(!config.filter_loading_messages);
    }

    #[test]
    fn test_from_config_rejects_bad_bind() {
        let file = DagwayConfig::from_toml("[server]\nbind = \"not-an-address\"\n").unwrap();
        let err = ServerConfig::from_config(&file).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_empty_token_disables_auth() {
        let file = DagwayConfig::from_toml("[auth]\nexpected_token = \"\"\n").unwrap();
        assert!(!ServerConfig::from_config(&file).unwrap().auth_enabled());
    }
}

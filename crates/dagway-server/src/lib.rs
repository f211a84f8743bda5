//! HTTP gateway for dagway.
//!
//! Serves the multiplexed orchestrator API, the browsable admin page and a
//! health check.
//!
//! # Endpoints
//!
//! - `GET|POST /admin/rest_api/api?api=<operation>&...`: run an operation and
//!   answer with a JSON envelope. Requires the token header when configured.
//! - `GET /admin/rest_api/`: HTML page listing workflows and operations.
//! - `GET /health`: liveness check.
//!
//! # Example
//!
//! ```ignore
//! use dagway_metadata::MetadataStore;
//! use dagway_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::new(Some("secret-token".to_string()))
//!     .with_bind_address("127.0.0.1:8080".parse()?);
//! let store = MetadataStore::open("/home/me/airflow/airflow.db")?;
//!
//! Server::new(config, store).run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod state;

pub use auth::{AUTH_FAILED_MESSAGE, auth_middleware};
pub use config::ServerConfig;
pub use envelope::{HandlerOutput, ResponseEnvelope, Status};
pub use error::{Result, ServerError};
pub use logging::request_logging_middleware;
pub use routes::{ADMIN_PATH, API_PATH};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use dagway_metadata::MetadataStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The dagway HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server over the given metadata store.
    pub fn new(config: ServerConfig, metadata: MetadataStore) -> Self {
        Self {
            state: AppState::new(config, metadata),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::get;

        Router::new()
            .merge(routes::health_routes())
            .route(ADMIN_PATH, get(routes::admin_handler))
            .route(ADMIN_PATH.trim_end_matches('/'), get(routes::admin_handler))
            .merge(self.api_routes())
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// The API endpoint, behind token authentication.
    fn api_routes(&self) -> Router<AppState> {
        use axum::routing::get;

        Router::new()
            .route(
                API_PATH,
                get(routes::api_handler).post(routes::api_handler),
            )
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::auth_middleware,
            ))
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Get the application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use dagway_config::DEFAULT_TOKEN_HEADER;
use dagway_metadata::{MetadataStore, Workflow};
use dagway_server::{API_PATH, Server, ServerConfig};

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// The auth token for the server.
    pub token: String,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Dags folder deployments are written to.
    pub dags_dir: TempDir,
    /// Background operation logs.
    pub logs_dir: TempDir,
}

impl TestServer {
    /// Start a server whose orchestrator CLI is `echo`, so every generic
    /// operation answers with its own command line.
    pub async fn start() -> Result<Self> {
        let dags_dir = TempDir::new()?;
        let logs_dir = TempDir::new()?;
        let token = "test-token".to_string();

        let addr = find_available_port().await?;

        let config = ServerConfig::new(Some(token.clone()))
            .with_bind_address(addr)
            .with_request_logging(false)
            .with_program("echo")
            .with_dags_folder(dags_dir.path())
            .with_base_log_folder(logs_dir.path());

        let store = MetadataStore::open_in_memory()?;
        store.register_workflow(&Workflow::new("sample_dag").with_fileloc("/dags/sample.py"))?;
        store.register_workflow(&Workflow::new("paused_dag").paused(true))?;

        let server = Server::new(config, store);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            token,
            client,
            _handle: handle,
            dags_dir,
            logs_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Authenticated GET of the API endpoint with the given query pairs.
    pub fn api(&self, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url(), API_PATH))
            .query(query)
            .header(DEFAULT_TOKEN_HEADER, &self.token)
    }

    /// Authenticated POST of the API endpoint with the given query pairs.
    pub fn api_post(&self, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url(), API_PATH))
            .query(query)
            .header(DEFAULT_TOKEN_HEADER, &self.token)
    }

    /// Check if server is healthy.
    pub async fn health(&self) -> Result<bool> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url()))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }
}

/// Send a request and decode the envelope.
pub async fn envelope(request: reqwest::RequestBuilder) -> Result<(u16, Value)> {
    let resp = request.send().await?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await?))
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}

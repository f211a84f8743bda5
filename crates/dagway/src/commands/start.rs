//! Start command - launches the HTTP gateway.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use dagway_config::{DagwayConfig, LoadedConfig};
use dagway_metadata::MetadataStore;
use dagway_server::{Server, ServerConfig};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Address to bind to, e.g. 0.0.0.0:8080 (overrides config)
    #[arg(short, long, env = "DAGWAY_BIND")]
    pub bind: Option<String>,

    /// Expected API token (or set DAGWAY_HTTP_TOKEN env var)
    #[arg(long, env = "DAGWAY_HTTP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Orchestrator executable (overrides config)
    #[arg(long)]
    pub program: Option<String>,

    /// Metadata database path (overrides config)
    #[arg(long)]
    pub metadata_db: Option<PathBuf>,

    /// Create the metadata database and its tables if they are missing
    #[arg(long)]
    pub init_metadata: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    // ── Load configuration ──────────────────────────────────────────────

    let loaded = match args.config {
        Some(ref path) => LoadedConfig {
            config: dagway_config::load_config_file(path)?,
            sources: vec![dagway_config::ConfigSource {
                path: path.clone(),
                loaded: true,
            }],
            warnings: Vec::new(),
        },
        None => ctx.load_config()?,
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    let mut config = loaded.config;
    apply_overrides(&mut config, &args);

    let server_config = ServerConfig::from_config(&config)?;

    if config.api().log_loading {
        log_effective_config(&server_config, &loaded.sources);
    }

    // ── Metadata store ──────────────────────────────────────────────────

    let db_path = config.orchestrator().metadata_db_path();
    let store = if args.init_metadata {
        let store = MetadataStore::create(&db_path).with_context(|| {
            format!("Failed to initialize metadata database {}", db_path.display())
        })?;
        tracing::info!(path = %db_path.display(), "Initialized metadata tables");
        store
    } else {
        MetadataStore::open(&db_path).with_context(|| {
            format!(
                "Failed to open metadata database {} (pass --init-metadata to create it)",
                db_path.display()
            )
        })?
    };

    if let Err(e) = std::fs::create_dir_all(&server_config.dags_folder) {
        tracing::warn!(
            path = %server_config.dags_folder.display(),
            error = %e,
            "Could not create dags folder"
        );
    }

    if !server_config.auth_enabled() {
        tracing::warn!("No API token configured; authentication is disabled");
    }

    if ctx.verbose {
        eprintln!("Listening on http://{}", server_config.bind_address);
    }

    Server::new(server_config, store).run().await?;
    Ok(())
}

/// Fold CLI flags and environment into the loaded configuration.
fn apply_overrides(config: &mut DagwayConfig, args: &StartArgs) {
    if let Some(ref bind) = args.bind {
        let mut server = config.server();
        server.bind = bind.clone();
        config.server = Some(server);
    }
    if let Some(ref token) = args.token {
        let mut auth = config.auth();
        auth.expected_token = Some(token.clone());
        config.auth = Some(auth);
    }
    if args.program.is_some() || args.metadata_db.is_some() {
        let mut orchestrator = config.orchestrator();
        if let Some(ref program) = args.program {
            orchestrator.program = program.clone();
        }
        if let Some(ref db) = args.metadata_db {
            orchestrator.metadata_db = db.clone();
        }
        config.orchestrator = Some(orchestrator);
    }
}

fn log_effective_config(config: &ServerConfig, sources: &[dagway_config::ConfigSource]) {
    let loaded: Vec<String> = sources
        .iter()
        .filter(|s| s.loaded)
        .map(|s| s.path.display().to_string())
        .collect();

    tracing::info!(
        bind = %config.bind_address,
        token_header = %config.token_header,
        token = %redact(config.auth_token.as_deref()),
        program = %config.program,
        dags_folder = %config.dags_folder.display(),
        base_log_folder = %config.base_log_folder.display(),
        webserver = %config.webserver_base_url,
        filter_loading_messages = config.filter_loading_messages,
        sources = ?loaded,
        "Loaded configuration"
    );
}

fn redact(token: Option<&str>) -> &'static str {
    match token {
        Some(t) if !t.is_empty() => "<redacted>",
        _ => "<none>",
    }
}

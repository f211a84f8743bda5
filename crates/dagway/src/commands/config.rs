//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use dagway_config::DagwayConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./dagway.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(ctx, local),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = redacted(&loaded.config);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("# dagway Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let server = config.server();
    println!("Server:");
    println!("  bind: {}", server.bind);
    println!("  request_logging: {}", server.request_logging);
    println!("  max_body_size: {}", server.max_body_size);
    println!();

    let auth = config.auth();
    println!("Auth:");
    println!("  token_header: {}", auth.token_header);
    println!(
        "  expected_token: {}",
        auth.expected_token.as_deref().unwrap_or("(disabled)")
    );
    println!();

    let orchestrator = config.orchestrator();
    println!("Orchestrator:");
    println!("  program: {}", orchestrator.program);
    println!("  metadata_db: {}", orchestrator.metadata_db_path().display());
    println!("  dags_folder: {}", orchestrator.dags_folder_path().display());
    println!(
        "  base_log_folder: {}",
        orchestrator.base_log_folder_path().display()
    );
    println!("  webserver: {}", orchestrator.webserver_base_url);
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'dagway config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(ctx: &Context, local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("dagway.toml")
    } else {
        ctx.user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, TEMPLATE)?;
    println!("Created {}", path.display());

    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if let Some(path) = ctx.user_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}

/// Copy of `config` safe to print.
fn redacted(config: &DagwayConfig) -> DagwayConfig {
    let mut config = config.clone();
    if let Some(ref mut auth) = config.auth
        && auth.expected_token.is_some()
    {
        auth.expected_token = Some("<redacted>".to_string());
    }
    config
}

const TEMPLATE: &str = r#"# dagway Configuration

[server]
bind = "127.0.0.1:8080"
request_logging = true

[auth]
token_header = "rest_api_plugin_http_token"
# Prefer the DAGWAY_HTTP_TOKEN environment variable over storing it here.
# expected_token = "change-me"

[orchestrator]
program = "airflow"
metadata_db = "~/airflow/airflow.db"
dags_folder = "~/airflow/dags"
base_log_folder = "~/airflow/logs"
webserver_base_url = "http://localhost:8080"

[api]
filter_loading_messages = true
log_loading = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        let config = DagwayConfig::from_toml(TEMPLATE).unwrap();
        assert_eq!(config.server().bind, "127.0.0.1:8080");
        assert!(!config.auth().is_enabled());
    }

    #[test]
    fn test_redacted_hides_token() {
        let config =
            DagwayConfig::from_toml("[auth]\nexpected_token = \"hunter2\"\n").unwrap();
        let shown = redacted(&config);
        assert_eq!(shown.auth().expected_token.as_deref(), Some("<redacted>"));
        assert!(!shown.to_toml().unwrap().contains("hunter2"));
    }
}

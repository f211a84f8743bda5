//! dagway - HTTP gateway for workflow orchestrator operations
//!
//! Main entry point for the dagway CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{apis, config, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// dagway - HTTP gateway for workflow orchestrator operations
#[derive(Parser)]
#[command(name = "dagway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User configuration directory (default: ~/.config/dagway)
    #[arg(long, global = true, env = "DAGWAY_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway
    Start(start::StartArgs),

    /// List the operations the gateway exposes
    Apis(apis::ApisArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "dagway=debug,dagway_server=debug,dagway_dispatch=debug,dagway_metadata=debug,dagway_config=debug,info"
    } else {
        "dagway=info,dagway_server=info,dagway_dispatch=info,dagway_metadata=info,warn"
    };

    let log_dir = cli
        .config_dir
        .clone()
        .or_else(dagway_config::xdg_config_dir)
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "dagway.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "dagway=trace,dagway_server=trace,dagway_dispatch=trace,dagway_metadata=trace,dagway_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config_dir,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Apis(args) => apis::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

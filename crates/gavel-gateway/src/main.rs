//! Gavel Gateway — the governance control plane's HTTP entry point.
//!
//! Usage:
//!   gavel-gateway --bind 127.0.0.1:8080 --database gavel.db --identities identities.json
//!
//! Environment variables override nothing the flags set; flags win. See
//! `GavelConfig` for the full knob list (`DATABASE_URL`, `HUMAN_API_KEY`,
//! `APPROVAL_TTL_SECONDS`, `BLAST_BOX_*`, …).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gavel_blastbox::DockerSandbox;
use gavel_gateway::config::GavelConfig;
use gavel_gateway::routes::create_router;
use gavel_gateway::state::AppState;
use gavel_gateway::sweeper::spawn_sweeper;

/// Gavel — governance gateway for autonomous agents.
///
/// Every proposed action is logged to the hash-chained Audit Spine,
/// evaluated against the policy constitution, optionally escalated to a
/// human, and executed only inside the Blast Box sandbox.
#[derive(Parser)]
#[command(name = "gavel-gateway", about = "Gavel governance control plane gateway")]
struct Cli {
    /// Listen address, e.g. 127.0.0.1:8080.
    #[arg(long)]
    bind: Option<String>,

    /// Ledger database path (overrides DATABASE_URL).
    #[arg(long)]
    database: Option<String>,

    /// Actor allow-list file (overrides IDENTITIES_PATH).
    #[arg(long)]
    identities: Option<PathBuf>,

    /// TOML policy rule set (defaults to the builtin v1.0.0 constitution).
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Sandbox workspace directory (overrides BLAST_BOX_WORKSPACE).
    #[arg(long)]
    workspace: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("gavel-gateway: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = GavelConfig::from_env()?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = cli.database {
        config.database_url = database;
    }
    if let Some(identities) = cli.identities {
        config.identities_path = identities;
    }
    if let Some(policy) = cli.policy {
        config.policy_path = Some(policy);
    }
    if let Some(workspace) = cli.workspace {
        config.blastbox_workspace = workspace;
    }

    let sandbox = Arc::new(DockerSandbox::new(config.blastbox.clone()));
    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config, sandbox)?;

    spawn_sweeper(state.clone());

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "gavel gateway listening");
    axum::serve(listener, router).await?;

    Ok(())
}

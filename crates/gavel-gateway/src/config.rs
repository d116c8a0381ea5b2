//! Environment-driven runtime configuration.
//!
//! Every knob has a default suitable for local operation; production
//! deployments override through the environment. Durations arrive as whole
//! seconds.

use std::path::PathBuf;
use std::time::Duration;

use gavel_contracts::{GavelError, GavelResult, SandboxEnvironment};

/// Everything the gateway needs to come up.
#[derive(Debug, Clone)]
pub struct GavelConfig {
    /// Ledger location: a filesystem path, `sqlite://<path>`, or `:memory:`.
    pub database_url: String,
    /// Bearer secret for `/approve` and `/deny`; empty disables them.
    pub human_api_key: String,
    /// How long a human grant stays consumable.
    pub approval_ttl_seconds: i64,
    /// Escalation window before a human is overdue.
    pub escalation_initial_seconds: i64,
    /// Escalation hard deadline before auto-deny.
    pub escalation_max_seconds: i64,
    /// Chain-verification bound for `/health`; 0 scans the full chain.
    pub max_verify_events: u64,
    /// Actor allow-list file.
    pub identities_path: PathBuf,
    /// Optional TOML rule set overriding the builtin policy.
    pub policy_path: Option<PathBuf>,
    /// Listen address for the HTTP server.
    pub bind_addr: String,
    /// Sandbox resource envelope.
    pub blastbox: SandboxEnvironment,
    /// Host directory mounted into the sandbox.
    pub blastbox_workspace: PathBuf,
    /// Per-request deadline for `/propose`.
    pub propose_deadline: Duration,
    /// Per-request deadline for `/health`.
    pub health_deadline: Duration,
    /// How often the auto-deny sweeper runs.
    pub sweep_interval: Duration,
}

impl Default for GavelConfig {
    fn default() -> Self {
        Self {
            database_url: "gavel.db".to_string(),
            human_api_key: String::new(),
            approval_ttl_seconds: 3600,
            escalation_initial_seconds: 300,
            escalation_max_seconds: 3600,
            max_verify_events: 0,
            identities_path: PathBuf::from("identities.json"),
            policy_path: None,
            bind_addr: "127.0.0.1:8080".to_string(),
            blastbox: gavel_blastbox::default_environment(),
            blastbox_workspace: PathBuf::from("workspace"),
            propose_deadline: Duration::from_secs(5),
            health_deadline: Duration::from_secs(3),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl GavelConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> GavelResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("DATABASE_URL") {
            config.database_url = value;
        }
        if let Ok(value) = std::env::var("HUMAN_API_KEY") {
            config.human_api_key = value;
        }
        if let Ok(value) = std::env::var("APPROVAL_TTL_SECONDS") {
            config.approval_ttl_seconds = parse_int("APPROVAL_TTL_SECONDS", &value)?;
        }
        if let Ok(value) = std::env::var("ESCALATION_INITIAL_TIMEOUT_SECONDS") {
            config.escalation_initial_seconds =
                parse_int("ESCALATION_INITIAL_TIMEOUT_SECONDS", &value)?;
        }
        if let Ok(value) = std::env::var("ESCALATION_MAX_TIMEOUT_SECONDS") {
            config.escalation_max_seconds = parse_int("ESCALATION_MAX_TIMEOUT_SECONDS", &value)?;
        }
        if let Ok(value) = std::env::var("MAX_VERIFY_EVENTS") {
            config.max_verify_events = parse_int("MAX_VERIFY_EVENTS", &value)? as u64;
        }
        if let Ok(value) = std::env::var("IDENTITIES_PATH") {
            config.identities_path = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("POLICY_RULES_PATH") {
            config.policy_path = Some(PathBuf::from(value));
        }
        if let Ok(value) = std::env::var("GATEWAY_BIND") {
            config.bind_addr = value;
        }

        if let Ok(value) = std::env::var("BLAST_BOX_IMAGE") {
            config.blastbox.image = value;
        }
        if let Ok(value) = std::env::var("BLAST_BOX_MEMORY") {
            config.blastbox.memory_limit = value;
        }
        if let Ok(value) = std::env::var("BLAST_BOX_CPUS") {
            config.blastbox.cpu_limit =
                value.parse().map_err(|e| GavelError::Config {
                    reason: format!("BLAST_BOX_CPUS '{value}' is not a number: {e}"),
                })?;
        }
        if let Ok(value) = std::env::var("BLAST_BOX_TIMEOUT_SECONDS") {
            config.blastbox.timeout_seconds =
                parse_int("BLAST_BOX_TIMEOUT_SECONDS", &value)? as u64;
        }
        if let Ok(value) = std::env::var("BLAST_BOX_WORKSPACE") {
            config.blastbox_workspace = PathBuf::from(value);
        }

        Ok(config)
    }

    /// The ledger path with any `sqlite://` scheme stripped.
    pub fn ledger_path(&self) -> &str {
        self.database_url
            .strip_prefix("sqlite://")
            .unwrap_or(&self.database_url)
    }
}

fn parse_int(name: &str, value: &str) -> GavelResult<i64> {
    value.parse().map_err(|e| GavelError::Config {
        reason: format!("{name} '{value}' is not an integer: {e}"),
    })
}

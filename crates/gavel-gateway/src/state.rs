//! Shared application state: every trusted component, wired once.

use std::sync::Arc;

use chrono::Duration;

use gavel_approvals::{ApprovalRegistry, EscalationWindows};
use gavel_audit::Ledger;
use gavel_blastbox::{BlastBox, EvidenceReviewer, Sandbox};
use gavel_contracts::GavelResult;
use gavel_identity::{BearerAuth, IdentityRegistry};
use gavel_policy::PolicyEngine;

use crate::config::GavelConfig;

/// The gateway's component graph. Cheap to clone; all members are shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GavelConfig>,
    pub ledger: Arc<Ledger>,
    pub engine: Arc<PolicyEngine>,
    pub registry: Arc<ApprovalRegistry>,
    pub identities: Arc<IdentityRegistry>,
    pub auth: BearerAuth,
    pub blastbox: Arc<BlastBox>,
    pub reviewer: Arc<EvidenceReviewer>,
}

impl AppState {
    /// Wire the component graph from pre-loaded parts.
    ///
    /// Used directly by tests and the demo; [`AppState::from_config`] is the
    /// file-loading front door the binary uses.
    pub fn assemble(
        config: GavelConfig,
        identities: IdentityRegistry,
        engine: PolicyEngine,
        sandbox: Arc<dyn Sandbox>,
    ) -> GavelResult<Self> {
        let ledger = match config.ledger_path() {
            ":memory:" => Ledger::open_in_memory()?,
            path => Ledger::open(std::path::Path::new(path))?,
        };
        let ledger = Arc::new(ledger);
        ledger.bootstrap(engine.version())?;

        let registry = ApprovalRegistry::new(
            Arc::clone(&ledger),
            EscalationWindows::from_seconds(
                config.escalation_initial_seconds,
                config.escalation_max_seconds,
            ),
            Duration::seconds(config.approval_ttl_seconds),
            engine.version(),
        );

        let auth = BearerAuth::new(config.human_api_key.clone());
        let blastbox = BlastBox::new(sandbox, config.blastbox_workspace.clone());

        Ok(Self {
            config: Arc::new(config),
            ledger,
            engine: Arc::new(engine),
            registry: Arc::new(registry),
            identities: Arc::new(identities),
            auth,
            blastbox: Arc::new(blastbox),
            reviewer: Arc::new(EvidenceReviewer::new()),
        })
    }

    /// Load identities and policy from the configured paths, then wire up.
    pub fn from_config(config: GavelConfig, sandbox: Arc<dyn Sandbox>) -> GavelResult<Self> {
        let identities = IdentityRegistry::from_file(&config.identities_path)?;
        let engine = match &config.policy_path {
            Some(path) => PolicyEngine::from_file(path)?,
            None => PolicyEngine::builtin(),
        };
        Self::assemble(config, identities, engine, sandbox)
    }
}

//! Request and response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gavel_audit::ChainReport;
use gavel_contracts::{Decision, EvidencePacket, Violation};

/// Body of `POST /propose`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposeRequest {
    pub actor_id: String,
    /// Proposal category, e.g. `bash`, `file_write`, `file_read`.
    pub action_type: String,
    /// The command or payload. A non-string JSON value is accepted and
    /// normalized to its compact text form.
    pub content: serde_json::Value,
}

impl ProposeRequest {
    /// The content as the policy engine and fingerprint see it.
    pub fn content_text(&self) -> String {
        match &self.content {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Body of a `POST /propose` response (any decision).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeResponse {
    pub decision: Decision,
    pub risk_score: f64,
    pub intent_event_id: Uuid,
    pub policy_event_id: Uuid,
    pub violations: Vec<Violation>,
}

/// Body of `POST /execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// The `intent_event_id` returned by `/propose`.
    pub proposal_id: Uuid,
}

/// Body of a successful `POST /execute` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub evidence_event_id: Uuid,
    pub evidence_packet: EvidencePacket,
}

/// Body of `POST /approve` and `POST /deny`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveRequest {
    pub intent_event_id: Uuid,
    pub policy_event_id: Uuid,
    /// Only meaningful for denials.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of a successful `POST /approve` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub ok: bool,
    pub approval_event_id: Uuid,
}

/// Body of a successful `POST /deny` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyResponse {
    pub ok: bool,
    pub denial_event_id: Uuid,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `critical`.
    pub status: String,
    pub service: String,
    pub chain: ChainReport,
}

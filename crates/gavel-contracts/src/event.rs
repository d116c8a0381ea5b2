//! Audit event types: the atomic unit of the Audit Spine.
//!
//! `AuditEvent` is a single row of the append-only ledger. Every event
//! commits to its predecessor via `previous_event_hash`, forming one strict
//! chain per ledger. Modifying any field invalidates `event_hash` and every
//! subsequent link, which chain verification detects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::Decision;

/// The sentinel `previous_event_hash` of the very first event in a ledger.
pub const GENESIS: &str = "GENESIS";

/// The closed vocabulary of ledger event types.
///
/// The wire form is the string stored in the `action_type` column, e.g.
/// `INBOUND_INTENT` or `POLICY_EVAL:ESCALATED`. Parsing is strict — an
/// unknown string is rejected rather than carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// An agent's raw proposal, logged before any evaluation.
    InboundIntent,
    /// The policy engine's decision for one intent.
    PolicyEval(Decision),
    /// A human granted approval for an escalated intent.
    HumanApprovalGranted,
    /// A human denied an escalated intent.
    HumanDenial,
    /// A previously granted approval was consumed by a re-submitted intent.
    ApprovalConsumed,
    /// An escalation expired without resolution and was denied automatically.
    AutoDeniedTimeout,
    /// The evidence packet produced by one sandboxed execution.
    EvidencePacket,
    /// The deterministic review of an evidence packet.
    EvidenceReview,
    /// Administrative: ledger initialization marker.
    SystemBootstrap,
}

impl ActionType {
    /// The exact string stored in the ledger's `action_type` column.
    pub fn as_wire(&self) -> String {
        match self {
            Self::InboundIntent => "INBOUND_INTENT".to_string(),
            Self::PolicyEval(decision) => format!("POLICY_EVAL:{decision}"),
            Self::HumanApprovalGranted => "HUMAN_APPROVAL_GRANTED".to_string(),
            Self::HumanDenial => "HUMAN_DENIAL".to_string(),
            Self::ApprovalConsumed => "APPROVAL_CONSUMED".to_string(),
            Self::AutoDeniedTimeout => "AUTO_DENIED_TIMEOUT".to_string(),
            Self::EvidencePacket => "EVIDENCE_PACKET".to_string(),
            Self::EvidenceReview => "EVIDENCE_REVIEW_DETERMINISTIC".to_string(),
            Self::SystemBootstrap => "SYSTEM_BOOTSTRAP".to_string(),
        }
    }

    /// Parse a wire string back into the closed vocabulary.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INBOUND_INTENT" => Some(Self::InboundIntent),
            "HUMAN_APPROVAL_GRANTED" => Some(Self::HumanApprovalGranted),
            "HUMAN_DENIAL" => Some(Self::HumanDenial),
            "APPROVAL_CONSUMED" => Some(Self::ApprovalConsumed),
            "AUTO_DENIED_TIMEOUT" => Some(Self::AutoDeniedTimeout),
            "EVIDENCE_PACKET" => Some(Self::EvidencePacket),
            "EVIDENCE_REVIEW_DETERMINISTIC" => Some(Self::EvidenceReview),
            "SYSTEM_BOOTSTRAP" => Some(Self::SystemBootstrap),
            other => {
                let decision = other.strip_prefix("POLICY_EVAL:")?;
                Decision::parse(decision).map(Self::PolicyEval)
            }
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_wire())
    }
}

impl Serialize for ActionType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown action type '{s}'")))
    }
}

/// A single row of the Audit Spine.
///
/// After the initial append no field is ever mutated; the storage layer
/// enforces this with row-level triggers, not convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Globally unique identifier (UUID v4).
    pub id: Uuid,

    /// Wall-clock timestamp, monotonically non-decreasing per chain tip.
    pub created_at: DateTime<Utc>,

    /// Opaque principal name, e.g. `agent:coder`, `human:alice`,
    /// `system:gateway`.
    pub actor_id: String,

    /// One of the closed event vocabulary.
    pub action_type: ActionType,

    /// Structured, schemaless payload. Canonicalized to a stable textual
    /// form when hashed.
    pub intent_payload: serde_json::Value,

    /// Version tag of the policy constitution in force at write time.
    pub policy_version: String,

    /// Hex-encoded SHA-256 over the canonical event material.
    pub event_hash: String,

    /// The predecessor's `event_hash`, or [`GENESIS`] for the first event.
    pub previous_event_hash: String,
}

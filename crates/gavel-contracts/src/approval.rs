//! Approval lifecycle types.
//!
//! An escalated intent moves through a small state machine driven entirely
//! by ledger events and elapsed wall-clock time. The registry never stores
//! state of its own — these types are views over the Spine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The review state of one escalated intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationState {
    /// Recently escalated; a reviewer is expected but not yet overdue.
    PendingReview,
    /// The initial review window elapsed without resolution.
    HumanRequired,
    /// A resolution event exists (grant, denial, consumption, or auto-deny).
    Resolved,
    /// The hard deadline elapsed without resolution. Terminal.
    AutoDeniedTimeout,
}

impl std::fmt::Display for EscalationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PendingReview => "PENDING_REVIEW",
            Self::HumanRequired => "HUMAN_REQUIRED",
            Self::Resolved => "RESOLVED",
            Self::AutoDeniedTimeout => "AUTO_DENIED_TIMEOUT",
        })
    }
}

/// A valid, consumable approval found at propose time.
///
/// Returned by `consume_if_valid` after the matching `APPROVAL_CONSUMED`
/// event has been appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumedApproval {
    /// The `HUMAN_APPROVAL_GRANTED` event that was consumed.
    pub approval_event_id: Uuid,
    /// The originally escalated `INBOUND_INTENT`.
    pub intent_event_id: Uuid,
    /// The `APPROVAL_CONSUMED` event recording the one-shot use.
    pub consumed_event_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

/// Per-state counts over all escalations, for health and operator views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationSummary {
    pub pending: usize,
    pub human_required: usize,
    pub auto_denied: usize,
    pub resolved: usize,
}

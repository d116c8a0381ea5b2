//! Escalation review windows and the pure state classifier.
//!
//! Elapsed time is measured from the `POLICY_EVAL:ESCALATED` event's
//! `created_at`. The boundaries are inclusive: at exactly the initial
//! window the state becomes `HUMAN_REQUIRED`, at exactly the hard deadline
//! it becomes `AUTO_DENIED_TIMEOUT`.

use chrono::{DateTime, Duration, Utc};

use gavel_contracts::EscalationState;

/// The two time bounds of the review window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationWindows {
    /// How long an escalation may sit before a human is overdue.
    pub initial: Duration,
    /// After this, the escalation is denied automatically.
    pub hard_deadline: Duration,
}

impl Default for EscalationWindows {
    fn default() -> Self {
        Self {
            initial: Duration::seconds(300),
            hard_deadline: Duration::seconds(3600),
        }
    }
}

impl EscalationWindows {
    pub fn from_seconds(initial: i64, hard_deadline: i64) -> Self {
        Self {
            initial: Duration::seconds(initial),
            hard_deadline: Duration::seconds(hard_deadline),
        }
    }
}

/// Classify an unresolved escalation by elapsed time alone.
///
/// Resolution events take precedence over this function — callers must
/// first check the ledger for a grant, denial, consumption, or auto-deny.
pub fn classify(
    escalated_at: DateTime<Utc>,
    now: DateTime<Utc>,
    windows: &EscalationWindows,
) -> EscalationState {
    let elapsed = now - escalated_at;
    if elapsed >= windows.hard_deadline {
        EscalationState::AutoDeniedTimeout
    } else if elapsed >= windows.initial {
        EscalationState::HumanRequired
    } else {
        EscalationState::PendingReview
    }
}

//! Policy decision and violation types.
//!
//! The policy engine consumes an `(action_type, content)` pair and produces
//! a `PolicyResult`. Anything other than `Approved` blocks execution until
//! a human intervenes (or permanently, for `Denied`).

use serde::{Deserialize, Serialize};

/// The authoritative outcome of one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// The action is permitted and may be executed in the sandbox.
    Approved,
    /// A hard rule was violated; the action is permanently refused.
    Denied,
    /// The accumulated risk requires explicit human approval.
    Escalated,
}

impl Decision {
    /// Parse the wire form (`APPROVED`, `DENIED`, `ESCALATED`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPROVED" => Some(Self::Approved),
            "DENIED" => Some(Self::Denied),
            "ESCALATED" => Some(Self::Escalated),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
            Self::Escalated => "ESCALATED",
        })
    }
}

/// A single rule hit, recorded whether it denied the action outright or
/// merely contributed risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Stable rule code, e.g. `NO_SUDO`, `DESTRUCTIVE_RM`.
    pub rule: String,
    /// Human-readable explanation, written to the audit log verbatim.
    pub description: String,
}

/// The full result of one policy evaluation.
///
/// Same inputs always yield the same `PolicyResult` — evaluation is pure
/// and the rule tables are fixed by `policy_version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub decision: Decision,
    /// Accumulated risk in `[0.0, 1.0]`; 0.0 is safe, 1.0 is critical.
    pub risk_score: f64,
    /// Every rule that fired, hard and risk alike, in table order.
    pub violations: Vec<Violation>,
}

impl PolicyResult {
    /// True when the action cleared policy without human involvement.
    pub fn passed(&self) -> bool {
        self.decision == Decision::Approved
    }
}

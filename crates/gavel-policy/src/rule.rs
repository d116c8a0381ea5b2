//! Policy rule types and configuration schema.
//!
//! A `RuleSet` is the declarative constitution the engine evaluates against.
//! It can be deserialized from TOML or taken from [`RuleSet::builtin`], which
//! is policy version `1.0.0`. The tables — patterns, weights, ordering — are
//! fixed by `version`; changing any entry means changing the version string
//! stamped on every ledger event.

use serde::{Deserialize, Serialize};

/// Which proposal categories a rule applies to.
///
/// Expressed as a plain string in TOML (kebab-case):
/// ```toml
/// applies_to = "shell"
/// applies_to = "file-mutation"
/// applies_to = "any"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionClass {
    /// Shell-executing action types: `bash`, `shell`, `command`, `exec`,
    /// `terminal`.
    Shell,
    /// File-mutating action types: `file_write`, `file_edit`, `file_delete`,
    /// `file_move`, `write`, `edit`, `delete`.
    FileMutation,
    /// Every action type.
    Any,
}

/// Action types treated as shell execution.
pub const SHELL_ACTION_TYPES: &[&str] = &["bash", "shell", "command", "exec", "terminal"];

/// Action types treated as file mutations.
pub const FILE_ACTION_TYPES: &[&str] = &[
    "file_write",
    "file_edit",
    "file_delete",
    "file_move",
    "write",
    "edit",
    "delete",
];

impl ActionClass {
    /// True when a rule of this class applies to the given action type.
    pub fn applies_to(self, action_type: &str) -> bool {
        let lowered = action_type.to_ascii_lowercase();
        match self {
            Self::Shell => SHELL_ACTION_TYPES.contains(&lowered.as_str()),
            Self::FileMutation => FILE_ACTION_TYPES.contains(&lowered.as_str()),
            Self::Any => true,
        }
    }
}

/// A rule whose match denies the proposal outright, regardless of any other
/// signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardRule {
    /// Stable code emitted in violations, e.g. `NO_SUDO`.
    pub code: String,
    /// Human description, written to the audit log verbatim.
    pub description: String,
    /// Regex matched against the proposal content.
    pub pattern: String,
    pub applies_to: ActionClass,
}

/// A rule whose match accumulates risk without directly denying.
///
/// A matching risk rule still records a violation entry, so denied and
/// escalated responses enumerate every signal that fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRule {
    /// Stable code emitted in violations, e.g. `DESTRUCTIVE_RM`.
    pub code: String,
    pub description: String,
    pub pattern: String,
    pub applies_to: ActionClass,
    /// Risk contribution in `[0, 1]`; the total clamps at 1.0.
    pub weight: f64,
}

/// The complete declarative rule set for one policy version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Version string stamped into every ledger event written under this
    /// constitution.
    pub version: String,
    /// Accumulated risk at or above this value escalates to a human.
    pub escalation_threshold: f64,
    /// Evaluated first, in declaration order.
    #[serde(default)]
    pub hard: Vec<HardRule>,
    /// Evaluated second, in declaration order.
    #[serde(default)]
    pub risk: Vec<RiskRule>,
}

impl RuleSet {
    /// Policy version `1.0.0`.
    ///
    /// `INFRA_MUTATION` complements `INFRA_VERB` so that read-only
    /// infrastructure commands (`kubectl get pods`) stay below the
    /// escalation threshold while mutating ones (`kubectl scale …`,
    /// `terraform apply`) reach it.
    pub fn builtin() -> Self {
        Self {
            version: "1.0.0".to_string(),
            escalation_threshold: 0.8,
            hard: vec![
                HardRule {
                    code: "NO_SUDO".to_string(),
                    description: "Use of 'sudo' is prohibited".to_string(),
                    pattern: r"\bsudo\b".to_string(),
                    applies_to: ActionClass::Shell,
                },
                HardRule {
                    code: "NO_CHMOD_777".to_string(),
                    description: "chmod 777 is prohibited".to_string(),
                    pattern: r"\bchmod\s+777\b".to_string(),
                    applies_to: ActionClass::Shell,
                },
                HardRule {
                    code: "PROTECTED_PATH".to_string(),
                    description: "Modification of governance-protected paths is prohibited"
                        .to_string(),
                    pattern: r"(^|[\s/\\])(governance[/\\]|policy[/\\]|identities\.json)"
                        .to_string(),
                    applies_to: ActionClass::FileMutation,
                },
            ],
            risk: vec![
                RiskRule {
                    code: "INFRA_VERB".to_string(),
                    description: "Cluster/infrastructure tooling invoked".to_string(),
                    pattern: r"\b(kubectl|terraform|helm)\b".to_string(),
                    applies_to: ActionClass::Shell,
                    weight: 0.4,
                },
                RiskRule {
                    code: "INFRA_MUTATION".to_string(),
                    description: "Mutating infrastructure subcommand invoked".to_string(),
                    pattern:
                        r"\b(kubectl|helm)\s+(scale|apply|delete|rollout|patch)\b|\bterraform\s+(apply|destroy)\b"
                            .to_string(),
                    applies_to: ActionClass::Shell,
                    weight: 0.4,
                },
                RiskRule {
                    code: "OUTBOUND_NETWORK".to_string(),
                    description: "Outbound network access from a shell action".to_string(),
                    pattern: r"\b(curl|wget)\b|\bhttps?://".to_string(),
                    applies_to: ActionClass::Shell,
                    weight: 0.3,
                },
                RiskRule {
                    code: "SHARED_CONFIG_WRITE".to_string(),
                    description: "Write under a shared configuration directory".to_string(),
                    pattern: r"(^|[\s/\\])(etc|config|\.config)[/\\]".to_string(),
                    applies_to: ActionClass::FileMutation,
                    weight: 0.2,
                },
                RiskRule {
                    code: "DESTRUCTIVE_RM".to_string(),
                    description: "Destructive recursive removal".to_string(),
                    pattern: r"\brm\s+-rf\b".to_string(),
                    applies_to: ActionClass::Shell,
                    weight: 0.5,
                },
                RiskRule {
                    code: "DESTRUCTIVE_SQL".to_string(),
                    description: "Destructive SQL DROP statement".to_string(),
                    pattern: r"\bDROP\b".to_string(),
                    applies_to: ActionClass::Any,
                    weight: 0.5,
                },
            ],
        }
    }
}

//! The deterministic policy evaluator.
//!
//! Evaluation algorithm:
//!
//! 1. Test every hard rule in declaration order; each match records a
//!    violation and marks the proposal for denial.
//! 2. Test every risk rule in declaration order; each match records a
//!    violation and adds its weight to the risk score.
//! 3. Clamp the score to `[0, 1]`.
//! 4. Decide: any hard hit → `Denied`; score ≥ threshold → `Escalated`;
//!    otherwise `Approved`.
//!
//! `evaluate` is a pure function of `(action_type, content)` — no I/O, no
//! clock, no randomness. Same inputs yield same outputs across processes.

use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use gavel_contracts::{Decision, GavelError, GavelResult, PolicyResult, Violation};

use crate::rule::{ActionClass, RuleSet};

#[derive(Debug)]
struct CompiledRule {
    code: String,
    description: String,
    regex: Regex,
    applies_to: ActionClass,
    /// `None` for hard rules; the risk contribution otherwise.
    weight: Option<f64>,
}

/// A compiled rule set, ready for evaluation.
///
/// Construct via [`PolicyEngine::new`], [`PolicyEngine::from_file`], or
/// [`PolicyEngine::builtin`], then share behind an `Arc` — evaluation takes
/// `&self` and never mutates.
#[derive(Debug)]
pub struct PolicyEngine {
    version: String,
    escalation_threshold: f64,
    hard: Vec<CompiledRule>,
    risk: Vec<CompiledRule>,
}

impl PolicyEngine {
    /// Compile a rule set.
    ///
    /// Returns `GavelError::Config` if any pattern fails to compile.
    pub fn new(rules: RuleSet) -> GavelResult<Self> {
        let compile = |code: &str, pattern: &str| -> GavelResult<Regex> {
            Regex::new(pattern).map_err(|e| GavelError::Config {
                reason: format!("rule '{code}' has an invalid pattern: {e}"),
            })
        };

        let mut hard = Vec::with_capacity(rules.hard.len());
        for rule in &rules.hard {
            hard.push(CompiledRule {
                code: rule.code.clone(),
                description: rule.description.clone(),
                regex: compile(&rule.code, &rule.pattern)?,
                applies_to: rule.applies_to,
                weight: None,
            });
        }

        let mut risk = Vec::with_capacity(rules.risk.len());
        for rule in &rules.risk {
            risk.push(CompiledRule {
                code: rule.code.clone(),
                description: rule.description.clone(),
                regex: compile(&rule.code, &rule.pattern)?,
                applies_to: rule.applies_to,
                weight: Some(rule.weight),
            });
        }

        Ok(Self {
            version: rules.version,
            escalation_threshold: rules.escalation_threshold,
            hard,
            risk,
        })
    }

    /// The built-in policy, version `1.0.0`.
    pub fn builtin() -> Self {
        Self::new(RuleSet::builtin()).expect("builtin rule set must compile")
    }

    /// Parse `s` as a TOML rule set and compile it.
    pub fn from_toml_str(s: &str) -> GavelResult<Self> {
        let rules: RuleSet = toml::from_str(s).map_err(|e| GavelError::Config {
            reason: format!("failed to parse policy TOML: {e}"),
        })?;
        Self::new(rules)
    }

    /// Read the file at `path` and parse it as a TOML rule set.
    pub fn from_file(path: &Path) -> GavelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GavelError::Config {
            reason: format!("failed to read policy file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The version string stamped on every event written under this policy.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Evaluate one proposal. Pure: no I/O, deterministic for all inputs.
    pub fn evaluate(&self, action_type: &str, content: &str) -> PolicyResult {
        let mut violations: Vec<Violation> = Vec::new();
        let mut hard_hit = false;
        let mut risk_score = 0.0_f64;

        for rule in &self.hard {
            if rule.applies_to.applies_to(action_type) && rule.regex.is_match(content) {
                hard_hit = true;
                violations.push(Violation {
                    rule: rule.code.clone(),
                    description: rule.description.clone(),
                });
            }
        }

        for rule in &self.risk {
            if rule.applies_to.applies_to(action_type) && rule.regex.is_match(content) {
                risk_score += rule.weight.unwrap_or(0.0);
                violations.push(Violation {
                    rule: rule.code.clone(),
                    description: rule.description.clone(),
                });
            }
        }

        let risk_score = risk_score.clamp(0.0, 1.0);

        let decision = if hard_hit {
            Decision::Denied
        } else if risk_score >= self.escalation_threshold {
            Decision::Escalated
        } else {
            Decision::Approved
        };

        match decision {
            Decision::Approved => debug!(
                action_type,
                risk_score, "policy evaluation approved proposal"
            ),
            Decision::Denied | Decision::Escalated => warn!(
                action_type,
                risk_score,
                decision = %decision,
                violation_count = violations.len(),
                "policy evaluation blocked proposal"
            ),
        }

        PolicyResult {
            decision,
            risk_score,
            violations,
        }
    }
}

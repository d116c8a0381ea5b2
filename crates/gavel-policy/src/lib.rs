//! # gavel-policy
//!
//! A deterministic, declarative policy engine for agent proposals.
//!
//! ## Overview
//!
//! This crate provides [`PolicyEngine`], a pure evaluator from
//! `(action_type, content)` to `{decision, risk_score, violations}`. Rules
//! come in two classes: *hard rules* deny outright, *risk rules* accumulate
//! a score that escalates to a human at the threshold. The rule set is data
//! ([`RuleSet`]) — loadable from TOML, versioned, and stamped onto every
//! ledger event so historical evaluations remain reproducible.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use gavel_policy::PolicyEngine;
//!
//! let engine = PolicyEngine::builtin();
//! let result = engine.evaluate("bash", "sudo rm -rf /");
//! assert_eq!(result.decision, gavel_contracts::Decision::Denied);
//! ```

pub mod engine;
pub mod rule;

pub use engine::PolicyEngine;
pub use rule::{ActionClass, HardRule, RiskRule, RuleSet};

// ── Tests ─────────────────────────────────────────────────────────────────────

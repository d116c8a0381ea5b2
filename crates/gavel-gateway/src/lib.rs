//! # gavel-gateway
//!
//! The HTTP gateway of the Gavel control plane: a thin orchestrator over
//! the trusted components.
//!
//! ## Request flow
//!
//! `POST /propose` authenticates the actor, writes `INBOUND_INTENT`, runs
//! the policy engine, consults the approval registry for escalations, and
//! writes `POLICY_EVAL:{decision}`. `POST /execute` hands an approved
//! proposal to the Blast Box and logs the evidence packet. `/approve` and
//! `/deny` are bearer-gated human endpoints. `GET /health` includes a
//! bounded chain-verification summary.
//!
//! Everything fail-closed: an unreachable ledger, sandbox, or verifier
//! means the action is blocked, never waved through.

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod service;
pub mod state;
pub mod sweeper;

pub use config::GavelConfig;
pub use error::{GatewayError, GatewayResult};
pub use routes::create_router;
pub use state::AppState;

// ── Tests ─────────────────────────────────────────────────────────────────────

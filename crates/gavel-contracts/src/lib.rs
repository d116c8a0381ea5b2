//! # gavel-contracts
//!
//! Shared types, schemas, and contracts for the Gavel control plane.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod approval;
pub mod decision;
pub mod error;
pub mod event;
pub mod evidence;

pub use approval::{ConsumedApproval, EscalationState, EscalationSummary};
pub use decision::{Decision, PolicyResult, Violation};
pub use error::{GavelError, GavelResult};
pub use event::{ActionType, AuditEvent, GENESIS};
pub use evidence::{EvidencePacket, SandboxEnvironment, WorkspaceDiff};

//! Runtime error types for the Gavel control plane.
//!
//! All fallible operations in the Gavel crates return `GavelResult<T>`.
//! Error variants carry enough context to produce actionable audit entries
//! and structured HTTP responses.

use thiserror::Error;

/// The unified error type for the Gavel control plane.
#[derive(Debug, Error)]
pub enum GavelError {
    /// The request body was malformed or referenced an unknown action type.
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    /// The caller could not be authenticated (unknown actor or bad bearer).
    #[error("unauthenticated: {reason}")]
    Unauthenticated { reason: String },

    /// A referenced event or proposal does not exist in the ledger.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The escalation already has a resolution (grant, denial, consumption,
    /// or auto-deny) and cannot be acted on again.
    #[error("escalation for intent '{intent_event_id}' is already resolved")]
    AlreadyResolved { intent_event_id: String },

    /// The sandbox runtime could not be reached or failed to launch.
    #[error("sandbox unavailable: {reason}")]
    SandboxUnavailable { reason: String },

    /// The storage layer rejected a mutation of an existing ledger row.
    ///
    /// This is treated as fatal for the surface it manifests on — the only
    /// legal writer path is `append`.
    #[error("ledger immutability violation: {reason}")]
    ImmutabilityViolation { reason: String },

    /// Two concurrent appends raced for the same chain tip. The caller may
    /// retry; the ledger itself remains consistent.
    #[error("chain serialization conflict at the ledger tip")]
    ChainSerializationConflict,

    /// Chain verification found a hash or linkage break.
    #[error("audit chain broken at event '{break_at}'")]
    ChainBroken { break_at: String },

    /// The storage layer failed outside of the interlock paths above.
    #[error("ledger error: {reason}")]
    Ledger { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Catch-all for unexpected faults; logged with request correlation.
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

/// Convenience alias used throughout the Gavel crates.
pub type GavelResult<T> = Result<T, GavelError>;

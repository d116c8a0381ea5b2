//! Gateway error type and HTTP mapping.
//!
//! Policy denials and approval-state conflicts are recoverable and return
//! structured bodies; immutability violations and chain breaks are fatal
//! for the surface they manifest on (HTTP 500) while the process stays up.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use gavel_contracts::{EscalationState, GavelError, Violation};

/// Errors surfaced by the gateway endpoints.
#[derive(Debug)]
pub enum GatewayError {
    /// Any core fault, mapped by taxonomy below.
    Core(GavelError),
    /// The proposal's latest decision is DENIED.
    PolicyDenied { violations: Vec<Violation> },
    /// The proposal is escalated and no valid grant has been consumed.
    ApprovalRequired { state: EscalationState },
    /// The actor's autonomy tier forbids execution.
    ExecutionForbidden { reason: String },
    /// The per-request deadline elapsed.
    DeadlineExceeded,
}

impl From<GavelError> for GatewayError {
    fn from(e: GavelError) -> Self {
        Self::Core(e)
    }
}

/// Structured error body returned on every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message, violations) = match self {
            Self::PolicyDenied { violations } => (
                StatusCode::FORBIDDEN,
                "POLICY_DENIED",
                "proposal denied by policy".to_string(),
                violations,
            ),
            Self::ApprovalRequired { state } => (
                StatusCode::ACCEPTED,
                "APPROVAL_REQUIRED",
                format!("proposal awaits human approval (state: {state})"),
                vec![],
            ),
            Self::ExecutionForbidden { reason } => {
                (StatusCode::FORBIDDEN, "EXECUTION_FORBIDDEN", reason, vec![])
            }
            Self::DeadlineExceeded => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "request deadline exceeded".to_string(),
                vec![],
            ),
            Self::Core(e) => {
                let (status, code) = match &e {
                    GavelError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                    GavelError::Unauthenticated { .. } => {
                        (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED")
                    }
                    GavelError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    GavelError::AlreadyResolved { .. } => {
                        (StatusCode::CONFLICT, "ALREADY_RESOLVED")
                    }
                    GavelError::SandboxUnavailable { .. } => {
                        (StatusCode::SERVICE_UNAVAILABLE, "SANDBOX_UNAVAILABLE")
                    }
                    GavelError::ImmutabilityViolation { .. } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "LEDGER_IMMUTABILITY_VIOLATION",
                    ),
                    GavelError::ChainBroken { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "CHAIN_BROKEN")
                    }
                    GavelError::ChainSerializationConflict => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CHAIN_SERIALIZATION_CONFLICT",
                    ),
                    GavelError::Ledger { .. }
                    | GavelError::Config { .. }
                    | GavelError::Internal { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
                    }
                };
                (status, code, e.to_string(), vec![])
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            violations,
        };
        (status, Json(body)).into_response()
    }
}

/// Result alias for gateway handlers and services.
pub type GatewayResult<T> = Result<T, GatewayError>;

//! Bearer-token authentication for the human approval endpoints.
//!
//! Approvals are guarded by one shared secret (`HUMAN_API_KEY`). Comparison
//! is constant-time; an empty configured secret disables the endpoints
//! entirely rather than leaving them open.

use subtle::ConstantTimeEq;

use gavel_contracts::{GavelError, GavelResult};

/// Validator for the human-endpoint bearer secret.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    /// `None` when no secret is configured — every request is refused.
    key: Option<String>,
}

impl BearerAuth {
    /// Build a validator. An empty key means "always refuse".
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            key: if key.is_empty() { None } else { Some(key) },
        }
    }

    /// Check a presented bearer token.
    pub fn verify(&self, token: &str) -> GavelResult<()> {
        let Some(key) = &self.key else {
            return Err(GavelError::Unauthenticated {
                reason: "no human API key is configured".to_string(),
            });
        };

        if key.as_bytes().ct_eq(token.as_bytes()).into() {
            Ok(())
        } else {
            Err(GavelError::Unauthenticated {
                reason: "invalid bearer token".to_string(),
            })
        }
    }
}

//! # gavel-identity
//!
//! Actor identity for the Gavel control plane: the allow-list that gates
//! `/propose`, the bearer secret that gates the human approval endpoints,
//! and the autonomy tiers that gate `/execute`.

pub mod auth;
pub mod registry;
pub mod tier;

pub use auth::BearerAuth;
pub use registry::{Identity, IdentityRegistry};
pub use tier::{policy_for, TierPolicy, TIER_POLICIES};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use gavel_contracts::GavelError;

    use super::*;

    const IDENTITIES: &str = r#"{
        "actors": {
            "agent:coder":  { "role": "agent", "status": "active",   "tier": 1 },
            "agent:parked": { "role": "agent", "status": "suspended", "tier": 1 },
            "agent:intern": { "role": "agent", "status": "active",   "tier": 0 },
            "human:alice":  { "role": "admin", "status": "active",   "tier": 3 }
        }
    }"#;

    // ── Registry ──────────────────────────────────────────────────────────────

    #[test]
    fn registry_loads_and_validates_active_actor() {
        let registry = IdentityRegistry::from_json_str(IDENTITIES).unwrap();
        assert_eq!(registry.len(), 4);

        let identity = registry.validate("agent:coder").unwrap();
        assert_eq!(identity.actor_id, "agent:coder");
        assert_eq!(identity.role, "agent");
        assert_eq!(identity.tier, 1);
    }

    #[test]
    fn registry_rejects_unknown_actor() {
        let registry = IdentityRegistry::from_json_str(IDENTITIES).unwrap();
        match registry.validate("agent:stranger") {
            Err(GavelError::Unauthenticated { reason }) => {
                assert!(reason.contains("unknown actor"), "{reason}");
            }
            other => panic!("expected Unauthenticated, got {other:?}"),
        }
    }

    #[test]
    fn registry_rejects_inactive_actor() {
        let registry = IdentityRegistry::from_json_str(IDENTITIES).unwrap();
        match registry.validate("agent:parked") {
            Err(GavelError::Unauthenticated { reason }) => {
                assert!(reason.contains("suspended"), "{reason}");
            }
            other => panic!("expected Unauthenticated, got {other:?}"),
        }
    }

    #[test]
    fn malformed_identities_file_is_a_config_error() {
        match IdentityRegistry::from_json_str("{ not json") {
            Err(GavelError::Config { .. }) => {}
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    // ── Bearer auth ───────────────────────────────────────────────────────────

    #[test]
    fn bearer_accepts_matching_token() {
        let auth = BearerAuth::new("secret-123");
        assert!(auth.verify("secret-123").is_ok());
    }

    #[test]
    fn bearer_rejects_wrong_token() {
        let auth = BearerAuth::new("secret-123");
        assert!(auth.verify("secret-124").is_err());
        assert!(auth.verify("").is_err());
        assert!(auth.verify("secret-123-and-more").is_err());
    }

    /// An empty configured secret must refuse everything — including an
    /// empty presented token.
    #[test]
    fn empty_configured_key_always_refuses() {
        let auth = BearerAuth::new("");
        assert!(auth.verify("").is_err());
        assert!(auth.verify("anything").is_err());
    }

    // ── Tiers ─────────────────────────────────────────────────────────────────

    #[test]
    fn tier_policies_gate_execution() {
        assert!(!policy_for(0).unwrap().can_execute);
        assert!(policy_for(1).unwrap().can_execute);
        assert!(policy_for(1).unwrap().requires_sandbox);
        assert!(!policy_for(2).unwrap().can_execute);
        assert!(policy_for(3).unwrap().can_execute);
        assert!(policy_for(3).unwrap().requires_human_approval);
        assert!(policy_for(4).is_none());
    }
}

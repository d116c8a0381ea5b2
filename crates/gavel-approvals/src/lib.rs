//! # gavel-approvals
//!
//! The approval lifecycle for escalated intents: a pure projection over the
//! Audit Spine with no state of its own.
//!
//! ## Overview
//!
//! When policy escalates a proposal, the intent enters a time-bounded review
//! window (`PENDING_REVIEW` → `HUMAN_REQUIRED` → `AUTO_DENIED_TIMEOUT`). A
//! human grant is one-shot, actor-scoped, and TTL-bounded: exactly one
//! identical re-submission by the same actor upgrades to APPROVED by
//! consuming the grant. Every transition is itself a ledger event.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gavel_approvals::{ApprovalRegistry, EscalationWindows};
//!
//! let registry = ApprovalRegistry::new(ledger, EscalationWindows::default(), ttl, "1.0.0");
//! registry.grant(intent_id, policy_id, "human:alice")?;
//! let consumed = registry.consume_if_valid("agent:coder", "bash", command, new_intent_id)?;
//! ```

pub mod registry;
pub mod state;

pub use registry::ApprovalRegistry;
pub use state::{classify, EscalationWindows};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    use gavel_audit::Ledger;
    use gavel_contracts::{ActionType, Decision, EscalationState, GavelError};

    use super::*;

    const TTL: i64 = 3600;

    fn registry(ledger: &Arc<Ledger>) -> ApprovalRegistry {
        ApprovalRegistry::new(
            Arc::clone(ledger),
            EscalationWindows::default(),
            Duration::seconds(TTL),
            "1.0.0",
        )
    }

    /// Write the intent + escalated-evaluation pair the gateway would.
    fn escalate(ledger: &Ledger, actor: &str, action_type: &str, content: &str) -> (Uuid, Uuid) {
        let intent = ledger
            .append(
                actor,
                ActionType::InboundIntent,
                json!({ "action_type": action_type, "content": content }),
                "1.0.0",
            )
            .unwrap();
        let policy = ledger
            .append(
                actor,
                ActionType::PolicyEval(Decision::Escalated),
                json!({
                    "decision": "ESCALATED",
                    "risk_score": 0.8,
                    "violations": [],
                    "intent_event_id": intent.id.to_string(),
                }),
                "1.0.0",
            )
            .unwrap();
        (intent.id, policy.id)
    }

    // ── One-shot consumption ──────────────────────────────────────────────────

    #[test]
    fn grant_is_consumed_exactly_once() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);
        let command = "kubectl scale deployment web --replicas=3";
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", command);

        registry.grant(intent_id, policy_id, "human:alice").unwrap();
        assert_eq!(registry.status(intent_id).unwrap(), EscalationState::Resolved);

        // First identical re-submission consumes the grant.
        let resubmit = Uuid::new_v4();
        let consumed = registry
            .consume_if_valid("agent:coder", "bash", command, resubmit)
            .unwrap()
            .expect("grant must be consumable once");
        assert_eq!(consumed.intent_event_id, intent_id);

        // The consumption is on the ledger, linking grant and re-submission.
        let event = ledger.get_by_id(consumed.consumed_event_id).unwrap().unwrap();
        assert_eq!(event.action_type, ActionType::ApprovalConsumed);
        assert_eq!(
            event.intent_payload["approval_event_id"],
            consumed.approval_event_id.to_string()
        );
        assert_eq!(
            event.intent_payload["current_intent_event_id"],
            resubmit.to_string()
        );

        // Second identical re-submission finds nothing.
        let second = registry
            .consume_if_valid("agent:coder", "bash", command, Uuid::new_v4())
            .unwrap();
        assert!(second.is_none(), "a grant is one-shot");

        assert!(ledger.verify(0).unwrap().chain_valid);
    }

    // ── Actor scoping ─────────────────────────────────────────────────────────

    #[test]
    fn consumption_is_actor_scoped() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", "terraform apply");

        registry.grant(intent_id, policy_id, "human:alice").unwrap();

        let stolen = registry
            .consume_if_valid("agent:other", "bash", "terraform apply", Uuid::new_v4())
            .unwrap();
        assert!(stolen.is_none(), "another actor must not consume the grant");

        // The original actor still can.
        let own = registry
            .consume_if_valid("agent:coder", "bash", "terraform apply", Uuid::new_v4())
            .unwrap();
        assert!(own.is_some());
    }

    // ── TTL bounding ──────────────────────────────────────────────────────────

    #[test]
    fn expired_grant_is_invisible() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = ApprovalRegistry::new(
            Arc::clone(&ledger),
            EscalationWindows::default(),
            Duration::milliseconds(1),
            "1.0.0",
        );
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", "helm rollout x");

        registry.grant(intent_id, policy_id, "human:alice").unwrap();
        std::thread::sleep(StdDuration::from_millis(20));

        let consumed = registry
            .consume_if_valid("agent:coder", "bash", "helm rollout x", Uuid::new_v4())
            .unwrap();
        assert!(consumed.is_none(), "expired grants never satisfy consumption");
    }

    // ── Denial exclusivity ────────────────────────────────────────────────────

    #[test]
    fn denial_blocks_consumption() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", "terraform destroy");

        registry
            .deny(intent_id, policy_id, Some("too risky"), "human:alice")
            .unwrap();

        let consumed = registry
            .consume_if_valid("agent:coder", "bash", "terraform destroy", Uuid::new_v4())
            .unwrap();
        assert!(consumed.is_none());
        assert_eq!(registry.status(intent_id).unwrap(), EscalationState::Resolved);
    }

    // ── Fingerprint matching ──────────────────────────────────────────────────

    /// The fingerprint is exact equality after whitespace trim — neither a
    /// substring nor a superstring of the approved command matches.
    #[test]
    fn fingerprint_requires_exact_trimmed_match() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);
        let command = "kubectl scale deployment web --replicas=3";
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", command);
        registry.grant(intent_id, policy_id, "human:alice").unwrap();

        // Different action type: no match.
        assert!(registry
            .consume_if_valid("agent:coder", "shell", command, Uuid::new_v4())
            .unwrap()
            .is_none());

        // Superstring of the approved command: no match.
        let widened = format!("{command} --force");
        assert!(registry
            .consume_if_valid("agent:coder", "bash", &widened, Uuid::new_v4())
            .unwrap()
            .is_none());

        // Identical modulo surrounding whitespace: match.
        let padded = format!("  {command}\n");
        assert!(registry
            .consume_if_valid("agent:coder", "bash", &padded, Uuid::new_v4())
            .unwrap()
            .is_some());
    }

    // ── Grant/deny validation ─────────────────────────────────────────────────

    #[test]
    fn grant_unknown_intent_is_not_found() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);

        match registry.grant(Uuid::new_v4(), Uuid::new_v4(), "human:alice") {
            Err(GavelError::NotFound { .. }) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn grant_requires_an_escalated_evaluation() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);

        let intent = ledger
            .append(
                "agent:coder",
                ActionType::InboundIntent,
                json!({ "action_type": "bash", "content": "ls" }),
                "1.0.0",
            )
            .unwrap();
        let approved_eval = ledger
            .append(
                "agent:coder",
                ActionType::PolicyEval(Decision::Approved),
                json!({ "decision": "APPROVED", "intent_event_id": intent.id.to_string() }),
                "1.0.0",
            )
            .unwrap();

        match registry.grant(intent.id, approved_eval.id, "human:alice") {
            Err(GavelError::BadRequest { reason }) => {
                assert!(reason.contains("not an ESCALATED"), "{reason}");
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn second_resolution_is_already_resolved() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", "helm delete app");

        registry.grant(intent_id, policy_id, "human:alice").unwrap();

        match registry.deny(intent_id, policy_id, None, "human:alice") {
            Err(GavelError::AlreadyResolved { .. }) => {}
            other => panic!("expected AlreadyResolved, got {other:?}"),
        }
        match registry.grant(intent_id, policy_id, "human:alice") {
            Err(GavelError::AlreadyResolved { .. }) => {}
            other => panic!("expected AlreadyResolved, got {other:?}"),
        }
    }

    // ── Timeout auto-deny ─────────────────────────────────────────────────────

    #[test]
    fn sweep_auto_denies_expired_escalations() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        // A zero hard deadline expires every escalation immediately.
        let registry = ApprovalRegistry::new(
            Arc::clone(&ledger),
            EscalationWindows::from_seconds(0, 0),
            Duration::seconds(TTL),
            "1.0.0",
        );
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", "kubectl apply -f x");

        let denied = registry.sweep_expired().unwrap();
        assert_eq!(denied, vec![intent_id]);

        // The sweep is idempotent: the escalation is now resolved.
        assert!(registry.sweep_expired().unwrap().is_empty());
        assert_eq!(registry.status(intent_id).unwrap(), EscalationState::Resolved);

        // Late approval attempts are refused.
        match registry.grant(intent_id, policy_id, "human:alice") {
            Err(GavelError::AlreadyResolved { .. }) => {}
            other => panic!("expected AlreadyResolved, got {other:?}"),
        }

        assert!(ledger.verify(0).unwrap().chain_valid);
    }

    // ── Tie-break ─────────────────────────────────────────────────────────────

    /// When two unexpired grants exist for the same intent (possible only
    /// under racing writers), the newest by insertion order wins — even if
    /// both carry the same timestamp; the older stays unconsumed.
    #[test]
    fn newest_grant_wins_tie_break() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);
        let (intent_id, policy_id) = escalate(&ledger, "agent:coder", "bash", "helm upgrade app");

        let grant_payload = json!({
            "intent_event_id": intent_id.to_string(),
            "policy_event_id": policy_id.to_string(),
            "granted_at": "2026-08-02T00:00:00.000000Z",
        });
        ledger
            .append(
                "human:alice",
                ActionType::HumanApprovalGranted,
                grant_payload.clone(),
                "1.0.0",
            )
            .unwrap();
        let newer = ledger
            .append("human:bob", ActionType::HumanApprovalGranted, grant_payload, "1.0.0")
            .unwrap();

        let consumed = registry
            .consume_if_valid("agent:coder", "bash", "helm upgrade app", Uuid::new_v4())
            .unwrap()
            .unwrap();
        assert_eq!(consumed.approval_event_id, newer.id);
    }

    // ── Summary ───────────────────────────────────────────────────────────────

    #[test]
    fn summary_counts_states() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let registry = registry(&ledger);

        let (resolved_intent, resolved_policy) =
            escalate(&ledger, "agent:coder", "bash", "terraform apply");
        registry
            .grant(resolved_intent, resolved_policy, "human:alice")
            .unwrap();
        escalate(&ledger, "agent:coder", "bash", "kubectl delete ns staging");

        let summary = registry.summary().unwrap();
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.human_required, 0);
        assert_eq!(summary.auto_denied, 0);
    }
}

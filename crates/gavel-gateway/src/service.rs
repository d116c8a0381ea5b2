//! Endpoint orchestration, free of HTTP concerns.
//!
//! Each function here is one endpoint's logic against the component graph;
//! the axum handlers in [`crate::routes`] are thin wrappers that add
//! extraction, deadlines, and status codes. Within a single proposal the
//! event order is fixed: `INBOUND_INTENT` → `POLICY_EVAL:*` → optional
//! `APPROVAL_CONSUMED` → optional `EVIDENCE_PACKET`.

use rusqlite::OptionalExtension;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use gavel_audit::map_event_row;
use gavel_contracts::{
    ActionType, AuditEvent, Decision, GavelError, PolicyResult, Violation,
};
use gavel_identity::policy_for;

use crate::dto::{
    ApproveResponse, DenyResponse, ExecuteResponse, HealthResponse, ProposeRequest,
    ProposeResponse, ResolveRequest,
};
use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;

/// How many times a tip serialization conflict is retried before giving up.
const APPEND_RETRIES: u32 = 3;

/// Append with bounded retry on tip serialization conflicts.
async fn append_with_retry(
    state: &AppState,
    actor_id: &str,
    action_type: ActionType,
    payload: serde_json::Value,
) -> Result<AuditEvent, GavelError> {
    let mut attempt = 0;
    loop {
        match state.ledger.append(
            actor_id,
            action_type.clone(),
            payload.clone(),
            state.engine.version(),
        ) {
            Err(GavelError::ChainSerializationConflict) if attempt + 1 < APPEND_RETRIES => {
                attempt += 1;
                warn!(attempt, "ledger tip conflict, retrying append");
                tokio::time::sleep(std::time::Duration::from_millis(50 * u64::from(attempt)))
                    .await;
            }
            other => return other,
        }
    }
}

// ── /propose ──────────────────────────────────────────────────────────────────

/// Authenticate, record the intent, evaluate, and record the decision.
///
/// An ESCALATED result first consults the approval registry: a valid grant
/// is consumed and the decision upgrades to APPROVED with the original risk
/// and violations intact.
pub async fn propose(state: &AppState, request: &ProposeRequest) -> GatewayResult<ProposeResponse> {
    state.identities.validate(&request.actor_id)?;

    if request.action_type.trim().is_empty() {
        return Err(GavelError::BadRequest {
            reason: "action_type must not be empty".to_string(),
        }
        .into());
    }
    let content = request.content_text();

    let intent = append_with_retry(
        state,
        &request.actor_id,
        ActionType::InboundIntent,
        json!({ "action_type": request.action_type, "content": content }),
    )
    .await?;

    let evaluation: PolicyResult = state.engine.evaluate(&request.action_type, &content);
    let mut decision = evaluation.decision;
    let mut consumed_approval: Option<Uuid> = None;

    if decision == Decision::Escalated {
        if let Some(consumed) = state.registry.consume_if_valid(
            &request.actor_id,
            &request.action_type,
            &content,
            intent.id,
        )? {
            decision = Decision::Approved;
            consumed_approval = Some(consumed.approval_event_id);
            info!(
                intent_event_id = %intent.id,
                approval_event_id = %consumed.approval_event_id,
                "escalation upgraded to approval via consumed grant"
            );
        }
    }

    let mut eval_payload = json!({
        "decision": decision,
        "risk_score": evaluation.risk_score,
        "violations": evaluation.violations,
        "intent_event_id": intent.id.to_string(),
    });
    if let Some(approval_event_id) = consumed_approval {
        eval_payload["consumed_approval_event_id"] =
            json!(approval_event_id.to_string());
    }

    let policy_event = append_with_retry(
        state,
        &request.actor_id,
        ActionType::PolicyEval(decision),
        eval_payload,
    )
    .await?;

    Ok(ProposeResponse {
        decision,
        risk_score: evaluation.risk_score,
        intent_event_id: intent.id,
        policy_event_id: policy_event.id,
        violations: evaluation.violations,
    })
}

// ── /execute ──────────────────────────────────────────────────────────────────

/// Run an approved proposal in the Blast Box and log its evidence.
pub async fn execute(state: &AppState, proposal_id: Uuid) -> GatewayResult<ExecuteResponse> {
    let intent = state
        .ledger
        .get_by_id(proposal_id)?
        .ok_or_else(|| GavelError::NotFound {
            what: format!("proposal '{proposal_id}'"),
        })?;
    if intent.action_type != ActionType::InboundIntent {
        return Err(GavelError::BadRequest {
            reason: format!("event '{proposal_id}' is not a proposal"),
        }
        .into());
    }

    let evaluation =
        latest_policy_eval_for(state, proposal_id)?.ok_or_else(|| GavelError::NotFound {
            what: format!("policy evaluation for proposal '{proposal_id}'"),
        })?;

    match &evaluation.action_type {
        ActionType::PolicyEval(Decision::Approved) => {}
        ActionType::PolicyEval(Decision::Escalated) => {
            let escalation_state = state.registry.status(proposal_id)?;
            return Err(GatewayError::ApprovalRequired {
                state: escalation_state,
            });
        }
        ActionType::PolicyEval(Decision::Denied) => {
            let violations: Vec<Violation> = evaluation
                .intent_payload
                .get("violations")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            return Err(GatewayError::PolicyDenied { violations });
        }
        _ => {
            return Err(GavelError::Internal {
                reason: format!("unexpected evaluation event for proposal '{proposal_id}'"),
            }
            .into());
        }
    }

    // Tiered autonomy: the proposing actor's tier decides whether approved
    // actions may run at all.
    let identity = state.identities.validate(&intent.actor_id)?;
    let tier = policy_for(identity.tier).ok_or_else(|| GavelError::Internal {
        reason: format!("actor '{}' has unknown tier {}", intent.actor_id, identity.tier),
    })?;
    if !tier.can_execute {
        return Err(GatewayError::ExecutionForbidden {
            reason: format!("tier {}: {}", tier.tier, tier.description),
        });
    }

    let command = intent
        .intent_payload
        .get("content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| intent.intent_payload["content"].to_string());

    let packet = state
        .blastbox
        .execute(&proposal_id.to_string(), &command)
        .await?;

    let packet_payload = serde_json::to_value(&packet).map_err(|e| GavelError::Internal {
        reason: format!("failed to serialize evidence packet: {e}"),
    })?;
    let evidence_event = append_with_retry(
        state,
        &intent.actor_id,
        ActionType::EvidencePacket,
        packet_payload,
    )
    .await?;

    // Deterministic post-execution review, logged alongside the evidence.
    let review = state.reviewer.review(&packet);
    let review_payload = json!({
        "proposal_id": proposal_id.to_string(),
        "evidence_event_id": evidence_event.id.to_string(),
        "evidence_hash": packet.evidence_hash,
        "passed": review.passed,
        "risk_delta": review.risk_delta,
        "findings": review.findings,
        "reviewed_at": review.reviewed_at,
    });
    append_with_retry(
        state,
        "system:evidence_review",
        ActionType::EvidenceReview,
        review_payload,
    )
    .await?;

    if !review.passed {
        warn!(
            proposal_id = %proposal_id,
            findings = review.findings.len(),
            "evidence review failed for executed proposal"
        );
    }

    Ok(ExecuteResponse {
        evidence_event_id: evidence_event.id,
        evidence_packet: packet,
    })
}

/// The newest `POLICY_EVAL:*` event referencing one intent.
fn latest_policy_eval_for(
    state: &AppState,
    intent_event_id: Uuid,
) -> Result<Option<AuditEvent>, GavelError> {
    let guard = state.ledger.lock()?;
    guard
        .connection()
        .query_row(
            "SELECT id, created_at, actor_id, action_type, intent_payload,
                    policy_version, event_hash, previous_event_hash
             FROM audit_events
             WHERE action_type LIKE 'POLICY_EVAL:%'
               AND json_extract(intent_payload, '$.intent_event_id') = ?1
             ORDER BY seq DESC LIMIT 1",
            rusqlite::params![intent_event_id.to_string()],
            map_event_row,
        )
        .optional()
        .map_err(|e| GavelError::Ledger {
            reason: e.to_string(),
        })
}

// ── /approve and /deny ────────────────────────────────────────────────────────

/// Record a human grant. Caller must already have passed bearer auth.
pub fn approve(state: &AppState, request: &ResolveRequest) -> GatewayResult<ApproveResponse> {
    let event = state.registry.grant(
        request.intent_event_id,
        request.policy_event_id,
        "human:operator",
    )?;
    Ok(ApproveResponse {
        ok: true,
        approval_event_id: event.id,
    })
}

/// Record a human denial. Caller must already have passed bearer auth.
pub fn deny(state: &AppState, request: &ResolveRequest) -> GatewayResult<DenyResponse> {
    let event = state.registry.deny(
        request.intent_event_id,
        request.policy_event_id,
        request.reason.as_deref(),
        "human:operator",
    )?;
    Ok(DenyResponse {
        ok: true,
        denial_event_id: event.id,
    })
}

// ── /health ───────────────────────────────────────────────────────────────────

/// Status plus a bounded chain-verification summary.
pub fn health(state: &AppState) -> GatewayResult<HealthResponse> {
    let chain = state.ledger.verify(state.config.max_verify_events)?;
    let status = if chain.chain_valid { "ok" } else { "critical" };
    Ok(HealthResponse {
        status: status.to_string(),
        service: "gavel".to_string(),
        chain,
    })
}

//! The approval registry: a pure projection over the Audit Spine.
//!
//! The registry owns no state. Every question — is this escalation
//! resolved, is there a consumable grant, which escalations have expired —
//! is answered by querying ledger events, and every answer that changes the
//! world is itself a new ledger event.
//!
//! Consumption is the one read-then-write sequence that must be atomic: it
//! runs entirely under a single [`LedgerGuard`], the ledger's exclusive tip
//! lock, so a grant can never be consumed twice.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use gavel_audit::{canonical_timestamp, map_event_row, Ledger, LedgerGuard};
use gavel_contracts::{
    ActionType, AuditEvent, ConsumedApproval, Decision, EscalationState, EscalationSummary,
    GavelError, GavelResult,
};

use crate::state::{classify, EscalationWindows};

const RESOLUTION_TYPES: &str =
    "('HUMAN_APPROVAL_GRANTED','HUMAN_DENIAL','APPROVAL_CONSUMED','AUTO_DENIED_TIMEOUT')";

/// Lifecycle manager for escalated intents.
pub struct ApprovalRegistry {
    ledger: Arc<Ledger>,
    windows: EscalationWindows,
    /// How long a grant stays consumable.
    approval_ttl: Duration,
    /// Stamped on every event the registry appends.
    policy_version: String,
}

impl ApprovalRegistry {
    pub fn new(
        ledger: Arc<Ledger>,
        windows: EscalationWindows,
        approval_ttl: Duration,
        policy_version: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            windows,
            approval_ttl,
            policy_version: policy_version.into(),
        }
    }

    /// The current review state of one escalated intent.
    pub fn status(&self, intent_event_id: Uuid) -> GavelResult<EscalationState> {
        let guard = self.ledger.lock()?;
        self.status_locked(&guard, intent_event_id, Utc::now())
    }

    fn status_locked(
        &self,
        guard: &LedgerGuard<'_>,
        intent_event_id: Uuid,
        now: DateTime<Utc>,
    ) -> GavelResult<EscalationState> {
        if resolution_exists(guard, intent_event_id)? {
            return Ok(EscalationState::Resolved);
        }
        let escalation = escalation_event_for(guard, intent_event_id)?.ok_or_else(|| {
            GavelError::NotFound {
                what: format!("escalation for intent '{intent_event_id}'"),
            }
        })?;
        Ok(classify(escalation.created_at, now, &self.windows))
    }

    /// Record a human approval for an escalated intent.
    ///
    /// Appends `HUMAN_APPROVAL_GRANTED`; the grant becomes consumable by one
    /// identical re-submission within the TTL.
    pub fn grant(
        &self,
        intent_event_id: Uuid,
        policy_event_id: Uuid,
        approver_actor: &str,
    ) -> GavelResult<AuditEvent> {
        let guard = self.ledger.lock()?;
        self.check_resolvable(&guard, intent_event_id, policy_event_id)?;

        let now = Utc::now();
        let event = guard.append(
            approver_actor,
            ActionType::HumanApprovalGranted,
            json!({
                "intent_event_id": intent_event_id.to_string(),
                "policy_event_id": policy_event_id.to_string(),
                "granted_at": canonical_timestamp(&now),
            }),
            &self.policy_version,
        )?;

        info!(
            intent_event_id = %intent_event_id,
            approval_event_id = %event.id,
            approver = %approver_actor,
            "human approval granted"
        );
        Ok(event)
    }

    /// Record a human denial for an escalated intent.
    ///
    /// A denial is terminal: it blocks any later grant or consumption for
    /// the same intent.
    pub fn deny(
        &self,
        intent_event_id: Uuid,
        policy_event_id: Uuid,
        reason: Option<&str>,
        approver_actor: &str,
    ) -> GavelResult<AuditEvent> {
        let guard = self.ledger.lock()?;
        self.check_resolvable(&guard, intent_event_id, policy_event_id)?;

        let now = Utc::now();
        let event = guard.append(
            approver_actor,
            ActionType::HumanDenial,
            json!({
                "intent_event_id": intent_event_id.to_string(),
                "policy_event_id": policy_event_id.to_string(),
                "reason": reason.unwrap_or("denied by human reviewer"),
                "denied_at": canonical_timestamp(&now),
            }),
            &self.policy_version,
        )?;

        info!(
            intent_event_id = %intent_event_id,
            denial_event_id = %event.id,
            approver = %approver_actor,
            "human denial recorded"
        );
        Ok(event)
    }

    /// Validate that the (intent, policy) pair names a live escalation.
    fn check_resolvable(
        &self,
        guard: &LedgerGuard<'_>,
        intent_event_id: Uuid,
        policy_event_id: Uuid,
    ) -> GavelResult<()> {
        let intent = guard.get_by_id(intent_event_id)?.ok_or_else(|| {
            GavelError::NotFound {
                what: format!("intent event '{intent_event_id}'"),
            }
        })?;
        if intent.action_type != ActionType::InboundIntent {
            return Err(GavelError::BadRequest {
                reason: format!("event '{intent_event_id}' is not an INBOUND_INTENT"),
            });
        }

        let policy_event = guard.get_by_id(policy_event_id)?.ok_or_else(|| {
            GavelError::NotFound {
                what: format!("policy event '{policy_event_id}'"),
            }
        })?;
        let escalated = policy_event.action_type == ActionType::PolicyEval(Decision::Escalated)
            && policy_event.intent_payload.get("intent_event_id")
                == Some(&serde_json::Value::String(intent_event_id.to_string()));
        if !escalated {
            return Err(GavelError::BadRequest {
                reason: format!(
                    "event '{policy_event_id}' is not an ESCALATED evaluation of intent '{intent_event_id}'"
                ),
            });
        }

        match self.status_locked(guard, intent_event_id, Utc::now())? {
            EscalationState::PendingReview | EscalationState::HumanRequired => Ok(()),
            EscalationState::Resolved | EscalationState::AutoDeniedTimeout => {
                Err(GavelError::AlreadyResolved {
                    intent_event_id: intent_event_id.to_string(),
                })
            }
        }
    }

    /// At propose time: find and consume the newest valid grant matching
    /// the re-submitted proposal.
    ///
    /// The match is actor-scoped and fingerprinted on
    /// `(action_type, trim(content))` — exact equality after whitespace
    /// trim, no other normalization. The read and the `APPROVAL_CONSUMED`
    /// append happen under one tip lock, which is what makes consumption
    /// one-shot under concurrency.
    pub fn consume_if_valid(
        &self,
        actor_id: &str,
        action_type: &str,
        content: &str,
        current_intent_event_id: Uuid,
    ) -> GavelResult<Option<ConsumedApproval>> {
        let guard = self.ledger.lock()?;
        let now = Utc::now();
        let cutoff = canonical_timestamp(&(now - self.approval_ttl));

        let Some(grant) = find_consumable_grant(&guard, actor_id, action_type, content, &cutoff)?
        else {
            return Ok(None);
        };

        let intent_event_id = grant
            .intent_payload
            .get("intent_event_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| GavelError::Internal {
                reason: format!("grant '{}' has no intent_event_id", grant.id),
            })?;

        let consumed = guard.append(
            "system:gateway",
            ActionType::ApprovalConsumed,
            json!({
                "approval_event_id": grant.id.to_string(),
                "intent_event_id": intent_event_id.to_string(),
                "current_intent_event_id": current_intent_event_id.to_string(),
                "consumed_at": canonical_timestamp(&now),
            }),
            &self.policy_version,
        )?;

        info!(
            approval_event_id = %grant.id,
            current_intent_event_id = %current_intent_event_id,
            actor_id,
            "approval consumed"
        );

        Ok(Some(ConsumedApproval {
            approval_event_id: grant.id,
            intent_event_id,
            consumed_event_id: consumed.id,
            granted_at: grant.created_at,
        }))
    }

    /// Auto-deny every escalation past the hard deadline.
    ///
    /// Appends one `AUTO_DENIED_TIMEOUT` event per expired escalation and
    /// returns the affected intent ids. Safe to run repeatedly — resolved
    /// escalations (including previously auto-denied ones) are skipped.
    pub fn sweep_expired(&self) -> GavelResult<Vec<Uuid>> {
        let guard = self.ledger.lock()?;
        let now = Utc::now();

        let mut auto_denied = Vec::new();
        for escalation in escalation_events(&guard)? {
            let Some(intent_event_id) = intent_ref(&escalation) else {
                continue;
            };
            if resolution_exists(&guard, intent_event_id)? {
                continue;
            }
            if classify(escalation.created_at, now, &self.windows)
                != EscalationState::AutoDeniedTimeout
            {
                continue;
            }

            guard.append(
                "system:gateway",
                ActionType::AutoDeniedTimeout,
                json!({
                    "intent_event_id": intent_event_id.to_string(),
                    "policy_event_id": escalation.id.to_string(),
                    "actor_id": escalation.actor_id,
                    "reason": "escalation expired without resolution",
                }),
                &self.policy_version,
            )?;

            warn!(
                intent_event_id = %intent_event_id,
                policy_event_id = %escalation.id,
                "escalation auto-denied after timeout"
            );
            auto_denied.push(intent_event_id);
        }

        Ok(auto_denied)
    }

    /// Per-state counts over every escalation in the ledger.
    pub fn summary(&self) -> GavelResult<EscalationSummary> {
        let guard = self.ledger.lock()?;
        let now = Utc::now();

        let mut summary = EscalationSummary::default();
        for escalation in escalation_events(&guard)? {
            let Some(intent_event_id) = intent_ref(&escalation) else {
                continue;
            };
            let state = if resolution_exists(&guard, intent_event_id)? {
                EscalationState::Resolved
            } else {
                classify(escalation.created_at, now, &self.windows)
            };
            match state {
                EscalationState::PendingReview => summary.pending += 1,
                EscalationState::HumanRequired => summary.human_required += 1,
                EscalationState::AutoDeniedTimeout => summary.auto_denied += 1,
                EscalationState::Resolved => summary.resolved += 1,
            }
        }
        Ok(summary)
    }
}

// ── Ledger projections ────────────────────────────────────────────────────────

fn sql_error(e: rusqlite::Error) -> GavelError {
    GavelError::Ledger {
        reason: e.to_string(),
    }
}

/// The intent id referenced by a registry-owned event payload.
fn intent_ref(event: &AuditEvent) -> Option<Uuid> {
    event
        .intent_payload
        .get("intent_event_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Does any resolution event reference this intent?
fn resolution_exists(guard: &LedgerGuard<'_>, intent_event_id: Uuid) -> GavelResult<bool> {
    let sql = format!(
        "SELECT COUNT(*) FROM audit_events
         WHERE action_type IN {RESOLUTION_TYPES}
           AND (json_extract(intent_payload, '$.intent_event_id') = ?1
                OR json_extract(intent_payload, '$.current_intent_event_id') = ?1)"
    );
    let count: i64 = guard
        .connection()
        .query_row(&sql, params![intent_event_id.to_string()], |row| row.get(0))
        .map_err(sql_error)?;
    Ok(count > 0)
}

/// The `POLICY_EVAL:ESCALATED` event for one intent, if any.
fn escalation_event_for(
    guard: &LedgerGuard<'_>,
    intent_event_id: Uuid,
) -> GavelResult<Option<AuditEvent>> {
    use rusqlite::OptionalExtension;
    guard
        .connection()
        .query_row(
            "SELECT id, created_at, actor_id, action_type, intent_payload,
                    policy_version, event_hash, previous_event_hash
             FROM audit_events
             WHERE action_type = 'POLICY_EVAL:ESCALATED'
               AND json_extract(intent_payload, '$.intent_event_id') = ?1
             ORDER BY seq DESC LIMIT 1",
            params![intent_event_id.to_string()],
            map_event_row,
        )
        .optional()
        .map_err(sql_error)
}

/// Every `POLICY_EVAL:ESCALATED` event, newest first.
fn escalation_events(guard: &LedgerGuard<'_>) -> GavelResult<Vec<AuditEvent>> {
    let mut stmt = guard
        .connection()
        .prepare(
            "SELECT id, created_at, actor_id, action_type, intent_payload,
                    policy_version, event_hash, previous_event_hash
             FROM audit_events
             WHERE action_type = 'POLICY_EVAL:ESCALATED'
             ORDER BY seq DESC",
        )
        .map_err(sql_error)?;
    let rows = stmt.query_map([], map_event_row).map_err(sql_error)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row.map_err(sql_error)?);
    }
    Ok(events)
}

/// The newest unconsumed, undenied, unexpired grant whose original intent
/// matches `(actor_id, action_type, trim(content))`.
///
/// Candidate filtering happens in SQL (actor scope, TTL cutoff, one-shot
/// and denial exclusions); the whitespace-trimmed content comparison runs
/// here so its semantics do not depend on the store's `trim()`.
fn find_consumable_grant(
    guard: &LedgerGuard<'_>,
    actor_id: &str,
    action_type: &str,
    content: &str,
    cutoff: &str,
) -> GavelResult<Option<AuditEvent>> {
    let mut stmt = guard
        .connection()
        .prepare(
            "SELECT a.id, a.created_at, a.actor_id, a.action_type, a.intent_payload,
                    a.policy_version, a.event_hash, a.previous_event_hash,
                    json_extract(intent.intent_payload, '$.content') AS intent_content
             FROM audit_events a
             JOIN audit_events intent
               ON intent.id = json_extract(a.intent_payload, '$.intent_event_id')
             WHERE a.action_type = 'HUMAN_APPROVAL_GRANTED'
               AND a.created_at >= ?1
               AND intent.actor_id = ?2
               AND json_extract(intent.intent_payload, '$.action_type') = ?3
               AND NOT EXISTS (
                   SELECT 1 FROM audit_events c
                   WHERE c.action_type = 'APPROVAL_CONSUMED'
                     AND json_extract(c.intent_payload, '$.approval_event_id') = a.id
               )
               AND NOT EXISTS (
                   SELECT 1 FROM audit_events d
                   WHERE d.action_type IN ('HUMAN_DENIAL','AUTO_DENIED_TIMEOUT')
                     AND json_extract(d.intent_payload, '$.intent_event_id')
                         = json_extract(a.intent_payload, '$.intent_event_id')
               )
             ORDER BY a.seq DESC",
        )
        .map_err(sql_error)?;

    let rows = stmt
        .query_map(params![cutoff, actor_id, action_type], |row| {
            let event = map_event_row(row)?;
            let intent_content: Option<String> = row.get(8)?;
            Ok((event, intent_content))
        })
        .map_err(sql_error)?;

    let wanted = content.trim();
    for row in rows {
        let (event, intent_content) = row.map_err(sql_error)?;
        if intent_content.as_deref().map(str::trim) == Some(wanted) {
            return Ok(Some(event));
        }
    }
    Ok(None)
}

//! # gavel-audit
//!
//! The Audit Spine: an immutable, append-only, SHA-256 hash-chained event
//! ledger with online chain verification.
//!
//! ## Overview
//!
//! Every side-effecting operation in the control plane is recorded as an
//! [`AuditEvent`](gavel_contracts::AuditEvent) that links to its predecessor
//! via SHA-256. Tampering with any stored field — even a single byte —
//! breaks the chain and is detected by [`Ledger::verify`].
//!
//! Immutability is an interlock, not a convention: the SQLite schema
//! installs row-level triggers that abort UPDATE and DELETE, and the
//! application layer has no code path that issues either statement.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gavel_audit::Ledger;
//! use gavel_contracts::ActionType;
//!
//! let ledger = Ledger::open(Path::new("gavel.db"))?;
//! let event = ledger.append(
//!     "agent:coder",
//!     ActionType::InboundIntent,
//!     serde_json::json!({ "action_type": "bash", "content": "ls" }),
//!     "1.0.0",
//! )?;
//! assert!(ledger.verify(0)?.chain_valid);
//! ```

pub mod canon;
pub mod chain;
pub mod store;

pub use canon::{canonical_json, canonical_timestamp};
pub use chain::{first_break, hash_event, hash_material, ChainReport};
pub use store::{map_event_row, EventFilter, Ledger, LedgerGuard};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use gavel_contracts::{ActionType, Decision, GENESIS};

    use super::*;

    fn intent_payload(text: &str) -> serde_json::Value {
        json!({ "action_type": "bash", "content": text })
    }

    // ── Chain formation ───────────────────────────────────────────────────────

    /// The first event links to the GENESIS sentinel.
    #[test]
    fn first_append_links_to_genesis() {
        let ledger = Ledger::open_in_memory().unwrap();
        let event = ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("ls"), "1.0.0")
            .unwrap();

        assert_eq!(event.previous_event_hash, GENESIS);
        assert_eq!(ledger.count().unwrap(), 1);
    }

    /// Sequential appends form one valid chain.
    #[test]
    fn sequential_appends_form_valid_chain() {
        let ledger = Ledger::open_in_memory().unwrap();
        let first = ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("one"), "1.0.0")
            .unwrap();
        let second = ledger
            .append(
                "agent:a",
                ActionType::PolicyEval(Decision::Approved),
                intent_payload("two"),
                "1.0.0",
            )
            .unwrap();
        let third = ledger
            .append("agent:b", ActionType::InboundIntent, intent_payload("three"), "1.0.0")
            .unwrap();

        assert_eq!(second.previous_event_hash, first.event_hash);
        assert_eq!(third.previous_event_hash, second.event_hash);

        let report = ledger.verify(0).unwrap();
        assert_eq!(report.total_events, 3);
        assert!(report.chain_valid);
        assert_eq!(report.break_at, None);
    }

    /// An empty ledger verifies trivially.
    #[test]
    fn empty_chain_is_valid() {
        let ledger = Ledger::open_in_memory().unwrap();
        let report = ledger.verify(0).unwrap();
        assert_eq!(report, ChainReport::empty());
    }

    /// The stored hash matches an independent recomputation from the
    /// materialized event.
    #[test]
    fn stored_hash_recomputes_from_event_fields() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("x"), "1.0.0")
            .unwrap();

        let events = ledger.list(&EventFilter::default(), 0, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(hash_event(&events[0]), events[0].event_hash);
    }

    /// Events sharing a `created_at` microsecond — the normal product of the
    /// monotonic clamp when the wall clock stalls or steps back — must still
    /// verify and extend in insertion order, regardless of how their random
    /// ids compare.
    #[test]
    fn identical_timestamps_keep_insertion_order() {
        let ledger = Ledger::open_in_memory().unwrap();
        let first = ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("one"), "1.0.0")
            .unwrap();

        // Hand-craft a successor that shares `first`'s exact timestamp but
        // sorts before it by id, as a stalled clock plus random UUIDs can
        // produce.
        let ts = canonical_timestamp(&first.created_at);
        let small_id = "00000000-0000-4000-8000-000000000000";
        let payload_text = "{}";
        let successor_hash = hash_material(
            &first.event_hash,
            "agent:a",
            "INBOUND_INTENT",
            payload_text,
            "1.0.0",
            &ts,
        );
        {
            let guard = ledger.lock().unwrap();
            guard
                .connection()
                .execute(
                    "INSERT INTO audit_events
                     (id, created_at, actor_id, action_type, intent_payload,
                      policy_version, event_hash, previous_event_hash)
                     VALUES (?1, ?2, 'agent:a', 'INBOUND_INTENT', ?3, '1.0.0', ?4, ?5)",
                    rusqlite::params![small_id, ts, payload_text, successor_hash, first.event_hash],
                )
                .unwrap();
        }

        // Verification walks insertion order, not (timestamp, id) order.
        let report = ledger.verify(0).unwrap();
        assert!(report.chain_valid, "false break at {:?}", report.break_at);
        assert_eq!(report.total_events, 2);

        // And the next append links to the true tail, not the event with
        // the largest id at that timestamp.
        let next = ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("three"), "1.0.0")
            .unwrap();
        assert_eq!(next.previous_event_hash, successor_hash);
        assert!(ledger.verify(0).unwrap().chain_valid);
    }

    // ── Immutability interlock ────────────────────────────────────────────────

    /// UPDATE is rejected by the storage layer itself.
    #[test]
    fn update_is_rejected_by_trigger() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("x"), "1.0.0")
            .unwrap();

        let guard = ledger.lock().unwrap();
        let result = guard
            .connection()
            .execute("UPDATE audit_events SET actor_id = 'agent:evil'", []);

        let err = result.expect_err("UPDATE must be rejected");
        assert!(
            err.to_string().contains("append-only"),
            "unexpected error: {err}"
        );
    }

    /// DELETE is rejected by the storage layer itself.
    #[test]
    fn delete_is_rejected_by_trigger() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("x"), "1.0.0")
            .unwrap();

        let guard = ledger.lock().unwrap();
        let err = guard
            .connection()
            .execute("DELETE FROM audit_events", [])
            .expect_err("DELETE must be rejected");
        assert!(err.to_string().contains("append-only"));
    }

    /// Two rows can never claim the same predecessor: the UNIQUE index on
    /// `previous_event_hash` rejects the second writer.
    #[test]
    fn duplicate_tip_link_is_rejected() {
        let ledger = Ledger::open_in_memory().unwrap();
        let first = ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("x"), "1.0.0")
            .unwrap();

        // Simulate a racing writer that read the same tip as `first` did.
        let guard = ledger.lock().unwrap();
        let err = guard
            .connection()
            .execute(
                "INSERT INTO audit_events
                 (id, created_at, actor_id, action_type, intent_payload,
                  policy_version, event_hash, previous_event_hash)
                 VALUES (?1, ?2, 'agent:b', 'INBOUND_INTENT', '{}', '1.0.0', 'h', ?3)",
                rusqlite::params![
                    uuid::Uuid::new_v4().to_string(),
                    canonical_timestamp(&chrono::Utc::now()),
                    first.previous_event_hash,
                ],
            )
            .expect_err("duplicate previous_event_hash must fail");

        assert!(err.to_string().contains("previous_event_hash"));
    }

    // ── Tamper detection ──────────────────────────────────────────────────────

    /// An out-of-band mutation of a stored field is caught by verify(),
    /// which reports the mutated event's id.
    #[test]
    fn out_of_band_tamper_is_detected() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("a"), "1.0.0")
            .unwrap();
        let victim = ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("b"), "1.0.0")
            .unwrap();
        ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("c"), "1.0.0")
            .unwrap();

        // Bypass the interlock the way an attacker with raw file access
        // would: remove the trigger, mutate, reinstall.
        {
            let guard = ledger.lock().unwrap();
            let conn = guard.connection();
            conn.execute("DROP TRIGGER audit_events_no_update", []).unwrap();
            conn.execute(
                "UPDATE audit_events SET actor_id = 'agent:evil' WHERE id = ?1",
                rusqlite::params![victim.id.to_string()],
            )
            .unwrap();
            conn.execute_batch(
                "CREATE TRIGGER audit_events_no_update
                 BEFORE UPDATE ON audit_events
                 BEGIN SELECT RAISE(ABORT, 'audit_events is append-only'); END;",
            )
            .unwrap();
        }

        let report = ledger.verify(0).unwrap();
        assert!(!report.chain_valid);
        assert_eq!(report.break_at, Some(victim.id));
        assert_eq!(report.total_events, 3);
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// N concurrent appends produce a single chain of length exactly N.
    #[test]
    fn concurrent_appends_form_single_chain() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(Ledger::open(&dir.path().join("concurrent.db")).unwrap());

        let mut handles = Vec::new();
        for thread in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                for i in 0..5 {
                    ledger
                        .append(
                            &format!("agent:t{thread}"),
                            ActionType::InboundIntent,
                            json!({ "content": format!("op {thread}/{i}") }),
                            "1.0.0",
                        )
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let report = ledger.verify(0).unwrap();
        assert_eq!(report.total_events, 40);
        assert!(report.chain_valid, "break at {:?}", report.break_at);
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    #[test]
    fn get_by_id_round_trips() {
        let ledger = Ledger::open_in_memory().unwrap();
        let written = ledger
            .append(
                "agent:a",
                ActionType::PolicyEval(Decision::Escalated),
                json!({ "decision": "ESCALATED", "risk_score": 0.8 }),
                "1.0.0",
            )
            .unwrap();

        let read = ledger.get_by_id(written.id).unwrap().unwrap();
        assert_eq!(read.id, written.id);
        assert_eq!(read.actor_id, "agent:a");
        assert_eq!(read.action_type, ActionType::PolicyEval(Decision::Escalated));
        assert_eq!(read.event_hash, written.event_hash);
        assert_eq!(read.created_at, written.created_at);

        assert!(ledger.get_by_id(uuid::Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_filters_by_actor_and_type() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .append("agent:a", ActionType::InboundIntent, intent_payload("1"), "1.0.0")
            .unwrap();
        ledger
            .append("agent:b", ActionType::InboundIntent, intent_payload("2"), "1.0.0")
            .unwrap();
        ledger
            .append(
                "agent:a",
                ActionType::PolicyEval(Decision::Approved),
                json!({}),
                "1.0.0",
            )
            .unwrap();

        let by_actor = ledger
            .list(
                &EventFilter {
                    actor_id: Some("agent:a".to_string()),
                    action_type: None,
                },
                0,
                10,
            )
            .unwrap();
        assert_eq!(by_actor.len(), 2);

        let by_type = ledger
            .list(
                &EventFilter {
                    actor_id: None,
                    action_type: Some("POLICY_EVAL:APPROVED".to_string()),
                },
                0,
                10,
            )
            .unwrap();
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type[0].actor_id, "agent:a");
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let ledger = Ledger::open_in_memory().unwrap();
        assert!(ledger.bootstrap("1.0.0").unwrap().is_some());
        assert!(ledger.bootstrap("1.0.0").unwrap().is_none());
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn verify_respects_max_events_bound() {
        let ledger = Ledger::open_in_memory().unwrap();
        for i in 0..5 {
            ledger
                .append(
                    "agent:a",
                    ActionType::InboundIntent,
                    intent_payload(&i.to_string()),
                    "1.0.0",
                )
                .unwrap();
        }

        // A bounded scan still reports the full event count.
        let report = ledger.verify(2).unwrap();
        assert_eq!(report.total_events, 5);
        assert!(report.chain_valid);
    }
}

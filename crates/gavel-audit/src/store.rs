//! SQLite-backed implementation of the Audit Spine.
//!
//! The ledger is one append-only table. Two properties are bound to the
//! storage layer itself rather than left to convention:
//!
//! - **Immutability** — `BEFORE UPDATE` / `BEFORE DELETE` triggers abort any
//!   mutation; the application has no code path that issues either statement.
//! - **Strict chain** — a UNIQUE index on `previous_event_hash` makes it
//!   impossible for two rows to claim the same predecessor.
//!
//! All appends serialize through an exclusive lock on the connection — the
//! chain tip is a single resource and serialization is correctness, not
//! performance, at human-in-the-loop rate.
//!
//! Chain order is the `seq` insertion sequence, never the wall clock: the
//! append path clamps `created_at` to be non-decreasing, so consecutive
//! events legitimately share a timestamp whenever the clock stalls or steps
//! back. Tip selection, listing, and verification all follow `seq`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use gavel_contracts::{ActionType, AuditEvent, GavelError, GavelResult, GENESIS};

use crate::canon::{canonical_json, canonical_timestamp, parse_timestamp};
use crate::chain::{first_break, hash_material, ChainReport};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS audit_events (
    seq                 INTEGER PRIMARY KEY AUTOINCREMENT,
    id                  TEXT NOT NULL UNIQUE,
    created_at          TEXT NOT NULL,
    actor_id            TEXT NOT NULL,
    action_type         TEXT NOT NULL,
    intent_payload      TEXT NOT NULL,
    policy_version      TEXT NOT NULL,
    event_hash          TEXT NOT NULL,
    previous_event_hash TEXT NOT NULL UNIQUE
);
CREATE INDEX IF NOT EXISTS idx_audit_events_created_at ON audit_events(created_at);
CREATE INDEX IF NOT EXISTS idx_audit_events_actor_id ON audit_events(actor_id);
CREATE INDEX IF NOT EXISTS idx_audit_events_action_type ON audit_events(action_type);
CREATE TRIGGER IF NOT EXISTS audit_events_no_update
BEFORE UPDATE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'audit_events is append-only');
END;
CREATE TRIGGER IF NOT EXISTS audit_events_no_delete
BEFORE DELETE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'audit_events is append-only');
END;
";

/// Optional filter for [`Ledger::list`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub actor_id: Option<String>,
    /// Matched against the wire string, e.g. `POLICY_EVAL:ESCALATED`.
    pub action_type: Option<String>,
}

/// The append-only, hash-chained event ledger.
///
/// Cheap to share behind an `Arc`; every operation takes the internal
/// connection lock for its duration.
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    /// Open (or create) a ledger at `path` and install the schema,
    /// indexes, and immutability triggers.
    pub fn open(path: &Path) -> GavelResult<Self> {
        let conn = Connection::open(path).map_err(open_error)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory ledger. Used by tests and the demo.
    pub fn open_in_memory() -> GavelResult<Self> {
        let conn = Connection::open_in_memory().map_err(open_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> GavelResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(open_error)?;
        conn.execute_batch(SCHEMA).map_err(open_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the exclusive tip lock.
    ///
    /// The guard is the compare-and-append primitive: projections that must
    /// read and then append atomically (approval consumption) hold one guard
    /// across both steps.
    pub fn lock(&self) -> GavelResult<LedgerGuard<'_>> {
        let conn = self.conn.lock().map_err(|e| GavelError::Ledger {
            reason: format!("ledger lock poisoned: {e}"),
        })?;
        Ok(LedgerGuard { conn })
    }

    /// Atomically attach a new event to the chain tip.
    pub fn append(
        &self,
        actor_id: &str,
        action_type: ActionType,
        intent_payload: Value,
        policy_version: &str,
    ) -> GavelResult<AuditEvent> {
        self.lock()?
            .append(actor_id, action_type, intent_payload, policy_version)
    }

    /// Write the administrative `SYSTEM_BOOTSTRAP` marker if, and only if,
    /// the ledger is empty. Returns the marker event, or `None` when the
    /// chain already has history.
    pub fn bootstrap(&self, policy_version: &str) -> GavelResult<Option<AuditEvent>> {
        let guard = self.lock()?;
        if guard.count()? > 0 {
            return Ok(None);
        }
        let event = guard.append(
            "system:bootstrap",
            ActionType::SystemBootstrap,
            serde_json::json!({ "service": "gavel" }),
            policy_version,
        )?;
        info!(event_id = %event.id, "ledger bootstrapped");
        Ok(Some(event))
    }

    /// Fetch a single event by id. Read-only.
    pub fn get_by_id(&self, id: Uuid) -> GavelResult<Option<AuditEvent>> {
        self.lock()?.get_by_id(id)
    }

    /// Page through events in insertion (chain) order.
    pub fn list(&self, filter: &EventFilter, page: u64, size: u64) -> GavelResult<Vec<AuditEvent>> {
        self.lock()?.list(filter, page, size)
    }

    /// Total number of events in the ledger.
    pub fn count(&self) -> GavelResult<u64> {
        self.lock()?.count()
    }

    /// Walk the chain in insertion order, recomputing
    /// every hash, and report the first break.
    ///
    /// `max_events == 0` scans the full chain. Verification never repairs;
    /// it only reports.
    pub fn verify(&self, max_events: u64) -> GavelResult<ChainReport> {
        self.lock()?.verify(max_events)
    }
}

/// Exclusive access to the ledger for the duration of one logical append
/// (plus any reads that must be atomic with it).
pub struct LedgerGuard<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl LedgerGuard<'_> {
    /// The underlying connection, for read-only projection queries.
    ///
    /// Mutation through this handle is rejected by the storage triggers; the
    /// only legal writer path is [`LedgerGuard::append`].
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Append one event to the chain tip held by this guard.
    ///
    /// Fills `created_at` (clamped to be non-decreasing relative to the
    /// tip), `previous_event_hash`, and `event_hash`.
    pub fn append(
        &self,
        actor_id: &str,
        action_type: ActionType,
        intent_payload: Value,
        policy_version: &str,
    ) -> GavelResult<AuditEvent> {
        let tip: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT event_hash, created_at FROM audit_events
                 ORDER BY seq DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(store_error)?;

        let mut created_at = Utc::now();
        let previous_event_hash = match tip {
            Some((tip_hash, tip_created)) => {
                // The chain tip's timestamp is the floor: under clock slew
                // the new event inherits it rather than sorting before it.
                if let Some(tip_ts) = parse_timestamp(&tip_created) {
                    if created_at < tip_ts {
                        created_at = tip_ts;
                    }
                }
                tip_hash
            }
            None => GENESIS.to_string(),
        };

        let id = Uuid::new_v4();
        let action_wire = action_type.as_wire();
        let payload_text = canonical_json(&intent_payload);
        let created_text = canonical_timestamp(&created_at);
        let created_at = parse_timestamp(&created_text)
            .expect("canonical_timestamp output always round-trips via parse_timestamp");
        let event_hash = hash_material(
            &previous_event_hash,
            actor_id,
            &action_wire,
            &payload_text,
            policy_version,
            &created_text,
        );

        self.conn
            .execute(
                "INSERT INTO audit_events
                 (id, created_at, actor_id, action_type, intent_payload,
                  policy_version, event_hash, previous_event_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    created_text,
                    actor_id,
                    action_wire,
                    payload_text,
                    policy_version,
                    event_hash,
                    previous_event_hash,
                ],
            )
            .map_err(store_error)?;

        Ok(AuditEvent {
            id,
            created_at,
            actor_id: actor_id.to_string(),
            action_type,
            intent_payload,
            policy_version: policy_version.to_string(),
            event_hash,
            previous_event_hash,
        })
    }

    /// Fetch a single event by id.
    pub fn get_by_id(&self, id: Uuid) -> GavelResult<Option<AuditEvent>> {
        self.conn
            .query_row(
                "SELECT id, created_at, actor_id, action_type, intent_payload,
                        policy_version, event_hash, previous_event_hash
                 FROM audit_events WHERE id = ?1",
                params![id.to_string()],
                map_event_row,
            )
            .optional()
            .map_err(store_error)
    }

    /// Page through events in insertion (chain) order.
    pub fn list(&self, filter: &EventFilter, page: u64, size: u64) -> GavelResult<Vec<AuditEvent>> {
        let mut sql = String::from(
            "SELECT id, created_at, actor_id, action_type, intent_payload,
                    policy_version, event_hash, previous_event_hash
             FROM audit_events WHERE 1=1",
        );
        let mut bound: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(actor_id) = &filter.actor_id {
            sql.push_str(" AND actor_id = ?");
            bound.push(rusqlite::types::Value::Text(actor_id.clone()));
        }
        if let Some(action_type) = &filter.action_type {
            sql.push_str(" AND action_type = ?");
            bound.push(rusqlite::types::Value::Text(action_type.clone()));
        }
        sql.push_str(" ORDER BY seq ASC LIMIT ? OFFSET ?");
        bound.push(rusqlite::types::Value::Integer(size as i64));
        bound.push(rusqlite::types::Value::Integer((page * size) as i64));

        let mut stmt = self.conn.prepare(&sql).map_err(store_error)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(bound), map_event_row)
            .map_err(store_error)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(store_error)?);
        }
        Ok(events)
    }

    /// Total number of events.
    pub fn count(&self) -> GavelResult<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_events", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(store_error)
    }

    /// Recompute and check the chain, bounded by `max_events` (0 = all).
    pub fn verify(&self, max_events: u64) -> GavelResult<ChainReport> {
        let total_events = self.count()?;
        let limit: i64 = if max_events == 0 {
            -1
        } else {
            max_events as i64
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, created_at, actor_id, action_type, intent_payload,
                        policy_version, event_hash, previous_event_hash
                 FROM audit_events ORDER BY seq ASC LIMIT ?1",
            )
            .map_err(store_error)?;
        let rows = stmt
            .query_map(params![limit], map_event_row)
            .map_err(store_error)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(store_error)?);
        }

        let break_at = first_break(&events);
        if let Some(id) = break_at {
            warn!(break_at = %id, total_events, "audit chain verification found a break");
        }
        Ok(ChainReport {
            total_events,
            chain_valid: break_at.is_none(),
            break_at,
        })
    }
}

/// Map one `audit_events` row to an [`AuditEvent`].
///
/// Public so projections (the approval registry) can reuse the exact same
/// decoding for their own queries.
pub fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEvent> {
    let id_text: String = row.get(0)?;
    let created_text: String = row.get(1)?;
    let actor_id: String = row.get(2)?;
    let action_text: String = row.get(3)?;
    let payload_text: String = row.get(4)?;

    let invalid = |msg: String| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
        )
    };

    Ok(AuditEvent {
        id: Uuid::parse_str(&id_text).map_err(|e| invalid(format!("bad event id: {e}")))?,
        created_at: parse_timestamp(&created_text)
            .ok_or_else(|| invalid(format!("bad created_at '{created_text}'")))?,
        actor_id,
        action_type: ActionType::parse(&action_text)
            .ok_or_else(|| invalid(format!("unknown action_type '{action_text}'")))?,
        intent_payload: serde_json::from_str(&payload_text)
            .map_err(|e| invalid(format!("bad intent_payload: {e}")))?,
        policy_version: row.get(5)?,
        event_hash: row.get(6)?,
        previous_event_hash: row.get(7)?,
    })
}

fn open_error(e: rusqlite::Error) -> GavelError {
    GavelError::Ledger {
        reason: format!("failed to open ledger: {e}"),
    }
}

/// Classify storage failures into the error taxonomy.
///
/// - the immutability triggers abort with a message containing
///   `append-only` → [`GavelError::ImmutabilityViolation`];
/// - a UNIQUE failure on `previous_event_hash` means two appends raced for
///   the tip → [`GavelError::ChainSerializationConflict`];
/// - everything else is a generic ledger fault.
fn store_error(e: rusqlite::Error) -> GavelError {
    let text = e.to_string();
    if text.contains("append-only") {
        return GavelError::ImmutabilityViolation { reason: text };
    }
    if text.contains("previous_event_hash") {
        return GavelError::ChainSerializationConflict;
    }
    GavelError::Ledger { reason: text }
}

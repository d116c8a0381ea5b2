//! Hash-chain primitives: event hashing and chain verification.
//!
//! Hash input layout (UTF-8 bytes, fields joined by a single `|`):
//!   1. previous_event_hash (or the `GENESIS` sentinel)
//!   2. actor_id
//!   3. action_type wire string
//!   4. canonical JSON of intent_payload
//!   5. policy_version
//!   6. canonical timestamp of created_at
//!
//! Every field that contributes to an event's hash is listed explicitly so
//! nothing is accidentally omitted.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use gavel_contracts::{AuditEvent, GENESIS};

use crate::canon::{canonical_json, canonical_timestamp};

/// Compute the SHA-256 hash for one event from its canonical material.
///
/// `payload_text` and `created_at_text` must already be in canonical form;
/// the ledger stores both columns canonically so verification can feed the
/// stored text straight back in.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_material(
    prev_hash: &str,
    actor_id: &str,
    action_type: &str,
    payload_text: &str,
    policy_version: &str,
    created_at_text: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(actor_id.as_bytes());
    hasher.update(b"|");
    hasher.update(action_type.as_bytes());
    hasher.update(b"|");
    hasher.update(payload_text.as_bytes());
    hasher.update(b"|");
    hasher.update(policy_version.as_bytes());
    hasher.update(b"|");
    hasher.update(created_at_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the hash of a fully materialized [`AuditEvent`].
pub fn hash_event(event: &AuditEvent) -> String {
    hash_material(
        &event.previous_event_hash,
        &event.actor_id,
        &event.action_type.as_wire(),
        &canonical_json(&event.intent_payload),
        &event.policy_version,
        &canonical_timestamp(&event.created_at),
    )
}

/// The outcome of one chain verification walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// Total rows in the ledger (not just the rows scanned).
    pub total_events: u64,
    pub chain_valid: bool,
    /// The id of the first event whose linkage or hash failed, if any.
    pub break_at: Option<Uuid>,
}

impl ChainReport {
    /// A report for an empty ledger — trivially valid.
    pub fn empty() -> Self {
        Self {
            total_events: 0,
            chain_valid: true,
            break_at: None,
        }
    }
}

/// Verify a slice of events already in insertion (chain) order.
///
/// Checks both rules for every event:
///
/// 1. **Linkage** — `previous_event_hash` equals the predecessor's
///    `event_hash` (or `GENESIS` for the first event).
/// 2. **Hash correctness** — `event_hash` matches the value recomputed from
///    the event's own fields.
///
/// Returns the id of the first event that fails either rule, or `None` when
/// the whole slice is intact. An empty slice is valid.
pub fn first_break(events: &[AuditEvent]) -> Option<Uuid> {
    let mut expected_prev = GENESIS.to_string();

    for event in events {
        if event.previous_event_hash != expected_prev {
            return Some(event.id);
        }
        if hash_event(event) != event.event_hash {
            return Some(event.id);
        }
        expected_prev = event.event_hash.clone();
    }

    None
}

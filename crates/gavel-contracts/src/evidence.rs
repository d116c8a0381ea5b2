//! Evidence packet types: the verifiable record of one sandboxed execution.
//!
//! Every field that participates in `evidence_hash` is persisted in the
//! packet itself, so a third party can recompute the hash from the stored
//! event alone.

use serde::{Deserialize, Serialize};

/// File-level side effects of one execution, paths only, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDiff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl WorkspaceDiff {
    /// All paths touched in any way, in diff-section order.
    pub fn touched(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .chain(self.deleted.iter())
            .map(String::as_str)
    }

    /// Paths that exist after the run (added or modified).
    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .map(String::as_str)
    }
}

/// The resource envelope the command ran under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxEnvironment {
    /// Container image, e.g. `python:3.12-slim`.
    pub image: String,
    /// Always `none` in the default configuration.
    pub network_mode: String,
    /// Memory cap in container-runtime syntax, e.g. `256m`.
    pub memory_limit: String,
    /// CPU cap as a fractional core count.
    pub cpu_limit: f64,
    /// Hard wall-clock kill deadline.
    pub timeout_seconds: u64,
}

/// The payload of an `EVIDENCE_PACKET` ledger event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePacket {
    /// The `INBOUND_INTENT` event id this execution satisfies.
    pub proposal_id: String,
    /// The shell command as executed.
    pub command: String,
    /// Process exit code; `-1` when the run was killed at the deadline.
    pub exit_code: i64,
    pub duration_ms: u64,
    /// Captured stdout, capped at 64 KiB.
    pub stdout: String,
    /// Captured stderr, capped at 64 KiB.
    pub stderr: String,
    pub timed_out: bool,
    pub workspace_diff: WorkspaceDiff,
    pub environment: SandboxEnvironment,
    /// Hex SHA-256 over the canonical encoding of every other field.
    pub evidence_hash: String,
}

//! Evidence packet assembly and hashing.
//!
//! `evidence_hash` is SHA-256 over the canonical JSON of every other packet
//! field. The same canonical encoder the Audit Spine uses feeds the hasher,
//! so anyone holding the `EVIDENCE_PACKET` event can recompute and check
//! the hash with no other inputs.

use serde_json::json;
use sha2::{Digest, Sha256};

use gavel_audit::canonical_json;
use gavel_contracts::{EvidencePacket, SandboxEnvironment, WorkspaceDiff};

use crate::sandbox::SandboxRun;

/// Assemble a packet from one sandbox run, filling `evidence_hash`.
pub fn build_packet(
    proposal_id: &str,
    command: &str,
    run: &SandboxRun,
    workspace_diff: WorkspaceDiff,
    environment: SandboxEnvironment,
) -> EvidencePacket {
    let mut packet = EvidencePacket {
        proposal_id: proposal_id.to_string(),
        command: command.to_string(),
        exit_code: run.exit_code,
        duration_ms: run.duration_ms,
        stdout: run.stdout.clone(),
        stderr: run.stderr.clone(),
        timed_out: run.timed_out,
        workspace_diff,
        environment,
        evidence_hash: String::new(),
    };
    packet.evidence_hash = compute_hash(&packet);
    packet
}

/// Recompute the hash from a packet's other fields.
///
/// `build_packet` and third-party verifiers both call this; a stored packet
/// is intact iff `compute_hash(&packet) == packet.evidence_hash`.
pub fn compute_hash(packet: &EvidencePacket) -> String {
    let material = json!({
        "command": packet.command,
        "exit_code": packet.exit_code,
        "duration_ms": packet.duration_ms,
        "stdout": packet.stdout,
        "stderr": packet.stderr,
        "timed_out": packet.timed_out,
        "workspace_diff": packet.workspace_diff,
        "environment": packet.environment,
    });
    hex::encode(Sha256::digest(canonical_json(&material).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> EvidencePacket {
        build_packet(
            "11111111-2222-3333-4444-555555555555",
            "echo hello",
            &SandboxRun {
                exit_code: 0,
                stdout: "hello\n".to_string(),
                stderr: String::new(),
                duration_ms: 42,
                timed_out: false,
            },
            WorkspaceDiff {
                added: vec!["out.txt".to_string()],
                modified: vec![],
                deleted: vec![],
            },
            crate::sandbox::default_environment(),
        )
    }

    /// Property: the stored hash recomputes identically from the packet's
    /// other fields.
    #[test]
    fn evidence_hash_recomputes() {
        let packet = sample_packet();
        assert_eq!(packet.evidence_hash.len(), 64);
        assert_eq!(compute_hash(&packet), packet.evidence_hash);
    }

    /// Any field change breaks the hash.
    #[test]
    fn evidence_hash_detects_tampering() {
        let mut packet = sample_packet();
        packet.stdout = "hello world\n".to_string();
        assert_ne!(compute_hash(&packet), packet.evidence_hash);

        let mut packet = sample_packet();
        packet.exit_code = 1;
        assert_ne!(compute_hash(&packet), packet.evidence_hash);
    }

    /// The hash survives a serde round-trip of the packet, as it must for
    /// verification from the ledger event payload.
    #[test]
    fn evidence_hash_survives_serde_round_trip() {
        let packet = sample_packet();
        let json = serde_json::to_string(&packet).unwrap();
        let restored: EvidencePacket = serde_json::from_str(&json).unwrap();
        assert_eq!(compute_hash(&restored), restored.evidence_hash);
    }
}

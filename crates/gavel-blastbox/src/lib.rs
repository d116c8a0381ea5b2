//! # gavel-blastbox
//!
//! Sandboxed execution of approved agent commands, with verifiable
//! evidence.
//!
//! ## Overview
//!
//! Approved shell actions never run on the host. The [`BlastBox`] runs them
//! through a [`Sandbox`] — a disposable container with no network, a
//! read-only root filesystem, tmpfs scratch, and memory/CPU caps — then
//! diffs the mounted workspace and assembles an
//! [`EvidencePacket`](gavel_contracts::EvidencePacket) whose `evidence_hash`
//! any third party can recompute. A deterministic [`EvidenceReviewer`]
//! scans the packet for signals policy could not see up front.
//!
//! The container runtime is an external capability behind the [`Sandbox`]
//! trait; [`FakeSandbox`] substitutes it in tests and the demo.

pub mod docker;
pub mod evidence;
pub mod fake;
pub mod review;
pub mod runner;
pub mod sandbox;
pub mod workspace;

pub use docker::DockerSandbox;
pub use evidence::{build_packet, compute_hash};
pub use fake::FakeSandbox;
pub use review::{EvidenceReviewer, ReviewFinding, ReviewResult, Severity};
pub use runner::BlastBox;
pub use sandbox::{default_environment, Sandbox, SandboxRun, MAX_OUTPUT_BYTES};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gavel_contracts::GavelError;

    use super::*;

    #[tokio::test]
    async fn execute_produces_hashed_packet_with_diff() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seed.txt"), "seed").unwrap();

        let sandbox = FakeSandbox::succeeding("done\n").with_side_effect(|workspace| {
            std::fs::write(workspace.join("result.txt"), "output").unwrap();
            std::fs::write(workspace.join("seed.txt"), "rewritten").unwrap();
        });
        let blastbox = BlastBox::new(Arc::new(sandbox), dir.path());

        let packet = blastbox.execute("prop-1", "sh build.sh").await.unwrap();

        assert_eq!(packet.proposal_id, "prop-1");
        assert_eq!(packet.command, "sh build.sh");
        assert_eq!(packet.exit_code, 0);
        assert_eq!(packet.stdout, "done\n");
        assert!(!packet.timed_out);
        assert_eq!(packet.workspace_diff.added, vec!["result.txt"]);
        assert_eq!(packet.workspace_diff.modified, vec!["seed.txt"]);
        assert!(packet.workspace_diff.deleted.is_empty());

        // The packet is self-verifying.
        assert_eq!(compute_hash(&packet), packet.evidence_hash);
    }

    #[tokio::test]
    async fn unavailable_runtime_is_an_error_not_a_packet() {
        let dir = tempfile::tempdir().unwrap();
        let blastbox = BlastBox::new(Arc::new(FakeSandbox::unavailable()), dir.path());

        match blastbox.execute("prop-2", "echo hi").await {
            Err(GavelError::SandboxUnavailable { .. }) => {}
            other => panic!("expected SandboxUnavailable, got {other:?}"),
        }
    }

    /// A timeout is a normal outcome: the packet records it and still
    /// carries the partial output.
    #[tokio::test]
    async fn timed_out_run_still_yields_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = FakeSandbox::with_result(SandboxRun {
            exit_code: -1,
            stdout: "partial out".to_string(),
            stderr: String::new(),
            duration_ms: 60_000,
            timed_out: true,
        });
        let blastbox = BlastBox::new(Arc::new(sandbox), dir.path());

        let packet = blastbox.execute("prop-3", "sleep 600").await.unwrap();
        assert!(packet.timed_out);
        assert_eq!(packet.exit_code, -1);
        assert_eq!(packet.stdout, "partial out");
        assert_eq!(compute_hash(&packet), packet.evidence_hash);
    }
}

//! The Blast Box: sandbox orchestration from command to evidence packet.
//!
//! `execute` is the single entry point the gateway calls for an approved
//! proposal: snapshot the workspace, run the command in the sandbox,
//! snapshot again, and fold the result into a hashed [`EvidencePacket`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use gavel_contracts::{EvidencePacket, GavelError, GavelResult};

use crate::evidence::build_packet;
use crate::sandbox::Sandbox;
use crate::workspace::{diff, snapshot};

/// Sandbox plus the workspace it mounts.
pub struct BlastBox {
    sandbox: Arc<dyn Sandbox>,
    workspace: PathBuf,
}

impl BlastBox {
    pub fn new(sandbox: Arc<dyn Sandbox>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            sandbox,
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Run one approved command and produce its evidence packet.
    ///
    /// A timeout is a normal outcome and still yields a packet
    /// (`timed_out = true`, `exit_code = -1`). Only an unreachable sandbox
    /// runtime is an error — and then no packet exists to log.
    pub async fn execute(&self, proposal_id: &str, command: &str) -> GavelResult<EvidencePacket> {
        if !self.sandbox.available().await {
            return Err(GavelError::SandboxUnavailable {
                reason: "sandbox runtime is not reachable".to_string(),
            });
        }

        std::fs::create_dir_all(&self.workspace).map_err(|e| GavelError::SandboxUnavailable {
            reason: format!(
                "cannot prepare workspace '{}': {e}",
                self.workspace.display()
            ),
        })?;

        let before = self.snapshot_workspace().await?;
        let run = self.sandbox.run(command, &self.workspace).await?;
        let after = self.snapshot_workspace().await?;

        let workspace_diff = diff(&before, &after);
        let packet = build_packet(
            proposal_id,
            command,
            &run,
            workspace_diff,
            self.sandbox.environment().clone(),
        );

        info!(
            proposal_id,
            exit_code = packet.exit_code,
            timed_out = packet.timed_out,
            duration_ms = packet.duration_ms,
            evidence_hash = %packet.evidence_hash,
            "blast box execution complete"
        );
        Ok(packet)
    }

    async fn snapshot_workspace(
        &self,
    ) -> GavelResult<std::collections::BTreeMap<String, String>> {
        let workspace = self.workspace.clone();
        tokio::task::spawn_blocking(move || snapshot(&workspace))
            .await
            .map_err(|e| GavelError::Internal {
                reason: format!("workspace snapshot task failed: {e}"),
            })?
    }
}

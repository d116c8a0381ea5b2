//! The sandbox capability seam.
//!
//! The Blast Box treats the container runtime as an external capability
//! behind a trait, so the gateway and the tests can substitute an
//! in-process fake. The real implementation is [`crate::docker::DockerSandbox`].

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gavel_contracts::{GavelResult, SandboxEnvironment};

/// Cap applied to each captured output stream.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// The raw outcome of one sandboxed command, before evidence assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxRun {
    /// Process exit code; `-1` when the run was killed at the deadline.
    pub exit_code: i64,
    /// Captured stdout, capped at [`MAX_OUTPUT_BYTES`].
    pub stdout: String,
    /// Captured stderr, capped at [`MAX_OUTPUT_BYTES`].
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

/// An isolated execution environment for one shell command at a time.
///
/// Implementations must guarantee: no network, read-only root filesystem,
/// ephemeral scratch space, and the workspace mounted at a well-known path.
/// A timeout is a normal outcome (`timed_out = true`, partial output
/// captured), not an error; errors are reserved for the runtime itself
/// being unreachable.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Is the runtime reachable right now?
    async fn available(&self) -> bool;

    /// Run `command` with `workspace` mounted read-write.
    async fn run(&self, command: &str, workspace: &Path) -> GavelResult<SandboxRun>;

    /// The resource envelope this sandbox applies, recorded into evidence.
    fn environment(&self) -> &SandboxEnvironment;
}

/// The default resource envelope, matching the documented knob defaults.
pub fn default_environment() -> SandboxEnvironment {
    SandboxEnvironment {
        image: "python:3.12-slim".to_string(),
        network_mode: "none".to_string(),
        memory_limit: "256m".to_string(),
        cpu_limit: 1.0,
        timeout_seconds: 60,
    }
}

//! In-process sandbox stand-in.
//!
//! `FakeSandbox` returns a scripted [`SandboxRun`] without launching
//! anything. Tests and the demo binary use it where a container runtime is
//! unavailable; an optional side effect can mutate the workspace so the
//! diff and evidence paths are exercised end to end.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use gavel_contracts::{GavelResult, SandboxEnvironment};

use crate::sandbox::{default_environment, Sandbox, SandboxRun};

type SideEffect = Arc<dyn Fn(&Path) + Send + Sync>;

/// A sandbox that replays a configured result.
#[derive(Clone)]
pub struct FakeSandbox {
    environment: SandboxEnvironment,
    available: bool,
    result: SandboxRun,
    side_effect: Option<SideEffect>,
}

impl FakeSandbox {
    /// A run that exits 0 with the given stdout.
    pub fn succeeding(stdout: &str) -> Self {
        Self::with_result(SandboxRun {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            duration_ms: 7,
            timed_out: false,
        })
    }

    /// Replay an arbitrary scripted run.
    pub fn with_result(result: SandboxRun) -> Self {
        Self {
            environment: default_environment(),
            available: true,
            result,
            side_effect: None,
        }
    }

    /// A sandbox whose runtime is unreachable.
    pub fn unavailable() -> Self {
        let mut fake = Self::succeeding("");
        fake.available = false;
        fake
    }

    /// Run `f` against the workspace during `run`, simulating command
    /// side effects for diff tests.
    pub fn with_side_effect(mut self, f: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.side_effect = Some(Arc::new(f));
        self
    }

    pub fn with_environment(mut self, environment: SandboxEnvironment) -> Self {
        self.environment = environment;
        self
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn available(&self) -> bool {
        self.available
    }

    async fn run(&self, _command: &str, workspace: &Path) -> GavelResult<SandboxRun> {
        if let Some(side_effect) = &self.side_effect {
            side_effect(workspace);
        }
        Ok(self.result.clone())
    }

    fn environment(&self) -> &SandboxEnvironment {
        &self.environment
    }
}

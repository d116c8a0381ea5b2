//! Docker-backed sandbox implementation.
//!
//! Each run gets a disposable container: no network, read-only root
//! filesystem, tmpfs `/tmp`, memory and CPU caps, and the workspace
//! bind-mounted at `/workspace`. The container is force-removed after the
//! run regardless of outcome.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use gavel_contracts::{GavelError, GavelResult, SandboxEnvironment};

use crate::sandbox::{Sandbox, SandboxRun, MAX_OUTPUT_BYTES};

/// Sandbox backed by a local Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerSandbox {
    environment: SandboxEnvironment,
}

impl DockerSandbox {
    pub fn new(environment: SandboxEnvironment) -> Self {
        Self { environment }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    /// Probe the daemon with `docker info`, bounded at 10 s.
    async fn available(&self) -> bool {
        let probe = Command::new("docker")
            .arg("info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        matches!(
            tokio::time::timeout(Duration::from_secs(10), probe).await,
            Ok(Ok(status)) if status.success()
        )
    }

    async fn run(&self, command: &str, workspace: &Path) -> GavelResult<SandboxRun> {
        let env = &self.environment;
        let container_name = format!("blastbox-{}", Uuid::new_v4().simple());
        let workspace_abs = workspace
            .canonicalize()
            .map_err(|e| GavelError::SandboxUnavailable {
                reason: format!("workspace '{}' is not usable: {e}", workspace.display()),
            })?;

        let mut child = Command::new("docker")
            .args([
                "run",
                "--name",
                &container_name,
                "--network",
                &env.network_mode,
                "--memory",
                &env.memory_limit,
                "--cpus",
                &env.cpu_limit.to_string(),
                "--read-only",
                "--tmpfs",
                "/tmp",
                "-v",
                &format!("{}:/workspace", workspace_abs.display()),
                "-w",
                "/workspace",
                &env.image,
                "sh",
                "-c",
                command,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GavelError::SandboxUnavailable {
                reason: format!("failed to launch container: {e}"),
            })?;

        // Drain both streams concurrently so a chatty command cannot fill
        // the pipe buffers and deadlock against the timeout.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_task = tokio::spawn(read_capped(stdout_pipe));
        let stderr_task = tokio::spawn(read_capped(stderr_pipe));

        debug!(container = %container_name, command, "blast box run starting");
        let started = Instant::now();

        let deadline = Duration::from_secs(env.timeout_seconds);
        let (exit_code, timed_out) = match tokio::time::timeout(deadline, child.wait()).await {
            Ok(Ok(status)) => (i64::from(status.code().unwrap_or(-1)), false),
            Ok(Err(e)) => {
                return Err(GavelError::Internal {
                    reason: format!("waiting on container failed: {e}"),
                });
            }
            Err(_) => {
                warn!(container = %container_name, "blast box run hit the deadline, killing");
                kill_container(&container_name).await;
                let _ = child.kill().await;
                (-1, true)
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        remove_container(&container_name).await;

        debug!(
            container = %container_name,
            exit_code,
            timed_out,
            duration_ms,
            "blast box run finished"
        );

        Ok(SandboxRun {
            exit_code,
            stdout,
            stderr,
            duration_ms,
            timed_out,
        })
    }

    fn environment(&self) -> &SandboxEnvironment {
        &self.environment
    }
}

/// Read a pipe to completion, keeping at most [`MAX_OUTPUT_BYTES`].
async fn read_capped<R>(pipe: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    let Some(mut pipe) = pipe else {
        return String::new();
    };

    let mut kept = Vec::with_capacity(8 * 1024);
    let mut buf = [0u8; 8 * 1024];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = MAX_OUTPUT_BYTES.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
                // Keep draining past the cap so the child never blocks.
            }
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}

async fn kill_container(name: &str) {
    let _ = tokio::time::timeout(
        Duration::from_secs(10),
        Command::new("docker")
            .args(["kill", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status(),
    )
    .await;
}

async fn remove_container(name: &str) {
    let _ = tokio::time::timeout(
        Duration::from_secs(10),
        Command::new("docker")
            .args(["rm", "-f", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status(),
    )
    .await;
}

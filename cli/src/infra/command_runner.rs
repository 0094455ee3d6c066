//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed kill on timeout or
//! cancellation.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::application::ports::CommandRunner;

/// Default timeout for platform CLI calls.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(60);

/// Production `CommandRunner`.
///
/// `tokio::time::timeout` around `.output().await` does not kill the child
/// on every platform when the future is dropped, so the child is raced in a
/// `tokio::select!` and killed explicitly when the timeout or the
/// cancellation token fires.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Output> {
        self.run_with_timeout(program, args, envs, self.timeout, cancel)
            .await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Output> {
        anyhow::ensure!(!cancel.is_cancelled(), "{program} not started: cancelled");
        // Arguments and env values may hold credentials; callers log what is safe.
        let env_names: Vec<&str> = envs.iter().map(|(k, _)| *k).collect();
        debug!(program, argc = args.len(), env = ?env_names, "spawning");

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .envs(envs.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        let output = tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok::<_, anyhow::Error>(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result?,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
            () = cancel.cancelled() => {
                let _ = child.kill().await;
                anyhow::bail!("{program} cancelled")
            }
        };

        trace!(
            program,
            status = ?output.status.code(),
            stdout_len = output.stdout.len(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "finished"
        );
        Ok(output)
    }
}

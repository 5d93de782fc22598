use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::{ProviderConfig, ProviderError};

/// Raw result of a finished provider process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Utility for spawning completion processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process, capture its output and wait for it to exit.
    ///
    /// When `config.timeout` is set the child is killed once it elapses.
    pub async fn spawn(
        binary: &Path,
        args: &[&str],
        config: &ProviderConfig,
    ) -> Result<ProcessOutput, ProviderError> {
        match config.timeout {
            Some(limit) => tokio::time::timeout(limit, Self::run(binary, args, config))
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => Self::run(binary, args, config).await,
        }
    }

    async fn run(
        binary: &Path,
        args: &[&str],
        config: &ProviderConfig,
    ) -> Result<ProcessOutput, ProviderError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            working_dir = %config.working_dir.display(),
            "Spawning provider process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;

        let stdout_handle = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::ExecutionFailed("stdout not captured".into()))?;
        let stderr_handle = child
            .stderr
            .take()
            .ok_or_else(|| ProviderError::ExecutionFailed("stderr not captured".into()))?;

        // Both pipes are drained together so neither can fill up and block the child
        let (stdout, stderr) = tokio::try_join!(
            collect_lines(stdout_handle, "stdout"),
            collect_lines(stderr_handle, "stderr"),
        )?;

        let status = child.wait().await?;
        let duration = start.elapsed();
        let exit_code = status.code().unwrap_or(-1);

        debug!(
            exit_code,
            duration_ms = duration.as_millis(),
            "Provider process completed"
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code,
            duration,
        })
    }
}

async fn collect_lines<R>(reader: R, stream: &'static str) -> Result<String, ProviderError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!(stream, line = %line, "process output");
                if !collected.is_empty() {
                    collected.push('\n');
                }
                collected.push_str(&line);
            }
            Ok(None) => return Ok(collected),
            Err(e) => {
                return Err(ProviderError::ExecutionFailed(format!(
                    "Failed to read {}: {}",
                    stream, e
                )))
            }
        }
    }
}

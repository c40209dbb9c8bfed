// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with a timeout, used by the generic and
//! synchronous cluster backends to invoke submit commands.

use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Default timeout for a cluster submit command (`<submitcmd> "<jobscript>"`).
pub const SUBMIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: String, timeout: Duration },

    #[error("{label} failed to spawn: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of a completed child process.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: std::process::ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// The first non-empty line of stdout, used by the generic cluster
    /// backend to read back the external job id.
    pub fn first_nonempty_stdout_line(&self) -> Option<String> {
        self.stdout_string()
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

/// Spawn `cmd`, wait for it to finish (capturing stdout/stderr) with a
/// hard timeout. `label` is only used for error messages and tracing.
pub async fn run_captured(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<CapturedOutput, ShellError> {
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().map_err(|source| ShellError::Spawn {
        label: label.to_string(),
        source,
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CapturedOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }),
        Ok(Err(source)) => Err(ShellError::Spawn {
            label: label.to_string(),
            source,
        }),
        Err(_) => {
            tracing::warn!(label, ?timeout, "subprocess timed out");
            Err(ShellError::Timeout {
                label: label.to_string(),
                timeout,
            })
        }
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;

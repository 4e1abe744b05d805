//! tmux implementation of the multiplexer contract
//!
//! Every call shells out to the tmux binary and is bounded by a timeout; a
//! timeout or non-zero exit is reported to the caller, never retried here.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{Multiplexer, MuxError};

/// Default bound on any single tmux invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for driving tmux via its CLI
#[derive(Debug, Clone)]
pub struct TmuxClient {
    /// Path to the tmux binary
    tmux_path: String,
    /// Per-call timeout
    timeout: Duration,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self {
            tmux_path: "tmux".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            tmux_path: "tmux".to_string(),
            timeout,
        }
    }

    /// Run tmux with the given arguments, bounded by the client timeout
    async fn run(&self, args: &[&str]) -> Result<std::process::Output, MuxError> {
        let mut cmd = Command::new(&self.tmux_path);
        cmd.args(args).stdin(Stdio::null());

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(args = ?args, timeout = ?self.timeout, "tmux call timed out");
                Err(MuxError::Timeout(self.timeout))
            }
        }
    }

    fn failure(output: &std::process::Output) -> MuxError {
        MuxError::CommandFailed {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Multiplexer for TmuxClient {
    async fn has_session(&self, name: &str) -> Result<bool, MuxError> {
        // "=" forces exact-name matching; without it tmux prefix-matches
        let target = format!("={}", name);
        let output = self.run(&["has-session", "-t", &target]).await?;

        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("can't find session")
            || stderr.contains("no server running")
            || stderr.contains("no current session")
        {
            return Ok(false);
        }
        Err(Self::failure(&output))
    }

    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<(), MuxError> {
        let cwd_str = cwd.to_string_lossy();
        let mut args = vec!["new-session", "-d", "-s", name, "-c", cwd_str.as_ref()];
        if let Some(cmd) = command {
            args.push(cmd);
        }

        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(Self::failure(&output));
        }

        tracing::info!(session = name, cwd = %cwd.display(), "Created tmux session");
        Ok(())
    }

    async fn capture_pane(&self, name: &str) -> Result<String, MuxError> {
        let target = format!("={}", name);
        let output = self.run(&["capture-pane", "-p", "-t", &target]).await?;

        if !output.status.success() {
            return Err(Self::failure(&output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn send_keys(&self, name: &str, text: &str) -> Result<(), MuxError> {
        let target = format!("={}", name);
        // -l sends the text literally instead of interpreting key names
        let output = self.run(&["send-keys", "-t", &target, "-l", text]).await?;

        if !output.status.success() {
            return Err(Self::failure(&output));
        }
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<(), MuxError> {
        let target = format!("={}", name);
        let output = self.run(&["kill-session", "-t", &target]).await?;

        if !output.status.success() {
            return Err(Self::failure(&output));
        }

        tracing::info!(session = name, "Killed tmux session");
        Ok(())
    }

    fn attach_command(&self, name: &str) -> Vec<String> {
        vec![
            self.tmux_path.clone(),
            "attach-session".to_string(),
            "-t".to_string(),
            format!("={}", name),
        ]
    }
}

/// Replace the current process image with an attach to the named session.
///
/// Only the command-line launch path calls this; on success it never
/// returns. The interactive surface performs its own in-process attach
/// instead.
#[cfg(unix)]
pub fn exec_attach(mux: &dyn Multiplexer, name: &str) -> std::io::Error {
    use std::os::unix::process::CommandExt;

    let argv = mux.attach_command(name);
    let (program, args) = match argv.split_first() {
        Some(split) => split,
        None => {
            return std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty attach command",
            )
        }
    };
    std::process::Command::new(program).args(args).exec()
}

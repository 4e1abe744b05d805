//! Multiplexer control surface
//!
//! The core depends on six operations — existence check, creation, pane
//! capture, key injection, attach, kill — regardless of which multiplexer
//! provides them. `TmuxClient` is the real implementation; `MockMultiplexer`
//! stands in for it in tests.

mod mock;
mod tmux;

pub use mock::MockMultiplexer;
pub use tmux::{exec_attach, TmuxClient};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("multiplexer command failed (exit {code}): {stderr}")]
    CommandFailed { code: i32, stderr: String },
    #[error("multiplexer call timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to invoke multiplexer: {0}")]
    Io(#[from] std::io::Error),
}

impl MuxError {
    /// True when a create failed because the name already exists —
    /// the signature of an out-of-band creation race.
    pub fn is_duplicate_session(&self) -> bool {
        matches!(self, MuxError::CommandFailed { stderr, .. } if stderr.contains("duplicate session"))
    }
}

/// The six-primitive session contract.
///
/// `attach` replaces the calling process image, so the trait exposes it as
/// the argv to exec rather than an async call; only the command-line entry
/// point uses it.
#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Does a session with this exact name exist?
    async fn has_session(&self, name: &str) -> Result<bool, MuxError>;

    /// Create a detached session rooted at `cwd`, running `command` if given
    /// (otherwise the default shell). Fails if the name already exists.
    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<(), MuxError>;

    /// Most recent visible pane content, used only for status classification
    async fn capture_pane(&self, name: &str) -> Result<String, MuxError>;

    /// Inject literal text into the session's active pane
    async fn send_keys(&self, name: &str, text: &str) -> Result<(), MuxError>;

    /// Kill the named session
    async fn kill_session(&self, name: &str) -> Result<(), MuxError>;

    /// Argv that attaches the current terminal to the session
    fn attach_command(&self, name: &str) -> Vec<String>;
}

/// Deterministic session name for a shortcut id.
///
/// Derived from the immutable id, never the key, so a shortcut keeps its
/// session across key reassignments. Pure and stable by design.
pub fn session_name_for(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("keymux-{}", &simple[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_name_is_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(session_name_for(id), session_name_for(id));
    }

    #[test]
    fn test_session_name_ignores_key() {
        // Distinct ids, distinct names; name depends on nothing else
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(session_name_for(a), session_name_for(b));
        assert!(session_name_for(a).starts_with("keymux-"));
    }

    #[test]
    fn test_duplicate_session_detection() {
        let err = MuxError::CommandFailed {
            code: 1,
            stderr: "duplicate session: keymux-abc".to_string(),
        };
        assert!(err.is_duplicate_session());
        assert!(!MuxError::Timeout(Duration::from_secs(5)).is_duplicate_session());
    }
}

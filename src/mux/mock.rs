//! In-memory multiplexer for tests
//!
//! Tracks create calls per name so tests can assert the at-most-once
//! creation contract, and can simulate out-of-band races and slow calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Multiplexer, MuxError};

#[derive(Debug, Clone)]
pub struct MockSessionRecord {
    pub cwd: PathBuf,
    pub command: Option<String>,
    pub pane: String,
}

#[derive(Default)]
struct MockState {
    sessions: HashMap<String, MockSessionRecord>,
    create_calls: HashMap<String, usize>,
    fail_next_create_as_duplicate: bool,
}

/// Mock implementation of the multiplexer contract
#[derive(Clone, Default)]
pub struct MockMultiplexer {
    state: Arc<Mutex<MockState>>,
    create_delay: Option<Duration>,
}

impl MockMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slow down create_session to widen concurrency windows in tests
    pub fn with_create_delay(delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            create_delay: Some(delay),
        }
    }

    /// Seed a pre-existing session, as if created out of band
    pub fn insert_session(&self, name: &str, cwd: PathBuf) {
        self.state.lock().sessions.insert(
            name.to_string(),
            MockSessionRecord {
                cwd,
                command: None,
                pane: String::new(),
            },
        );
    }

    /// Remove a session, as if killed out of band
    pub fn remove_session(&self, name: &str) {
        self.state.lock().sessions.remove(name);
    }

    /// Replace the pane content returned by capture_pane
    pub fn set_pane(&self, name: &str, content: &str) {
        if let Some(record) = self.state.lock().sessions.get_mut(name) {
            record.pane = content.to_string();
        }
    }

    /// Make the next create_session fail the way tmux does when the name
    /// appeared between the existence check and creation
    pub fn fail_next_create_as_duplicate(&self) {
        self.state.lock().fail_next_create_as_duplicate = true;
    }

    /// How many times create_session was invoked for this name
    pub fn create_calls(&self, name: &str) -> usize {
        self.state.lock().create_calls.get(name).copied().unwrap_or(0)
    }

    /// Total create_session invocations across all names
    pub fn total_create_calls(&self) -> usize {
        self.state.lock().create_calls.values().sum()
    }

    /// Inspect a created session
    pub fn session(&self, name: &str) -> Option<MockSessionRecord> {
        self.state.lock().sessions.get(name).cloned()
    }
}

#[async_trait]
impl Multiplexer for MockMultiplexer {
    async fn has_session(&self, name: &str) -> Result<bool, MuxError> {
        Ok(self.state.lock().sessions.contains_key(name))
    }

    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<(), MuxError> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        *state.create_calls.entry(name.to_string()).or_insert(0) += 1;

        if state.fail_next_create_as_duplicate || state.sessions.contains_key(name) {
            state.fail_next_create_as_duplicate = false;
            return Err(MuxError::CommandFailed {
                code: 1,
                stderr: format!("duplicate session: {}", name),
            });
        }

        state.sessions.insert(
            name.to_string(),
            MockSessionRecord {
                cwd: cwd.to_path_buf(),
                command: command.map(|c| c.to_string()),
                pane: String::new(),
            },
        );
        Ok(())
    }

    async fn capture_pane(&self, name: &str) -> Result<String, MuxError> {
        self.state
            .lock()
            .sessions
            .get(name)
            .map(|r| r.pane.clone())
            .ok_or_else(|| MuxError::CommandFailed {
                code: 1,
                stderr: format!("can't find session: {}", name),
            })
    }

    async fn send_keys(&self, name: &str, text: &str) -> Result<(), MuxError> {
        let mut state = self.state.lock();
        match state.sessions.get_mut(name) {
            Some(record) => {
                record.pane.push_str(text);
                Ok(())
            }
            None => Err(MuxError::CommandFailed {
                code: 1,
                stderr: format!("can't find session: {}", name),
            }),
        }
    }

    async fn kill_session(&self, name: &str) -> Result<(), MuxError> {
        match self.state.lock().sessions.remove(name) {
            Some(_) => Ok(()),
            None => Err(MuxError::CommandFailed {
                code: 1,
                stderr: format!("can't find session: {}", name),
            }),
        }
    }

    fn attach_command(&self, name: &str) -> Vec<String> {
        vec!["true".to_string(), name.to_string()]
    }
}

//! The find-or-create core

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::data::Shortcut;
use crate::git::{WorktreeError, WorktreeManager};
use crate::mux::{session_name_for, Multiplexer, MuxError};
use crate::status::{classify, SessionStatus};
use crate::tool::ToolPaths;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Worktree(#[from] WorktreeError),
    #[error(transparent)]
    Mux(#[from] MuxError),
    #[error("session \"{0}\" was created out of band during launch")]
    CreateConflict(String),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Runtime binding between a shortcut and a live multiplexer session.
///
/// Never persisted; forgotten when the session dies.
#[derive(Debug, Clone)]
pub struct Session {
    pub shortcut_id: Uuid,
    /// Deterministic multiplexer session name
    pub mux_session: String,
    /// Project path, or the provisioned worktree path
    pub working_dir: PathBuf,
    /// Classification at the time this record was produced
    pub status: SessionStatus,
}

/// Orchestrates session lifecycle for shortcuts
pub struct SessionManager {
    mux: Arc<dyn Multiplexer>,
    worktrees: WorktreeManager,
    tool_paths: ToolPaths,
    /// One guard per shortcut id: serializes creation for the same
    /// shortcut while distinct shortcuts proceed independently
    guards: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(
        mux: Arc<dyn Multiplexer>,
        worktrees: WorktreeManager,
        tool_paths: ToolPaths,
    ) -> Self {
        Self {
            mux,
            worktrees,
            tool_paths,
            guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn multiplexer(&self) -> Arc<dyn Multiplexer> {
        self.mux.clone()
    }

    /// Resolve a shortcut to its live session, creating it on demand.
    ///
    /// Idempotent: if the deterministic session already exists it is
    /// returned as-is and nothing new is spawned. Creation for one shortcut
    /// id is serialized; a timed-out or failed attempt leaves the next call
    /// free to re-check existence rather than assume absence. An
    /// out-of-band creation between the existence check and our create is
    /// reported as `CreateConflict`; callers may retry once.
    pub async fn find_or_create_for_shortcut(
        &self,
        shortcut: &Shortcut,
    ) -> Result<Session, SessionError> {
        let name = session_name_for(shortcut.id);

        if self.mux.has_session(&name).await? {
            return self.wrap_existing(shortcut, name).await;
        }

        let guard = self.guard_for(shortcut.id);
        let _held = guard.lock().await;

        // Re-check under the guard: a racing call for the same shortcut may
        // have created the session while we waited
        if self.mux.has_session(&name).await? {
            return self.wrap_existing(shortcut, name).await;
        }

        // Worktree failures must abort before any session exists
        let provisioned = self.provision(shortcut).await?;

        let command = shortcut.tool.launch_command(
            &shortcut.cli_options,
            shortcut.skip_permissions,
            &self.tool_paths,
        );

        match self
            .mux
            .create_session(&name, &provisioned.path, command.as_deref())
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_duplicate_session() => {
                tracing::warn!(session = %name, "Session appeared out of band during launch");
                return Err(SessionError::CreateConflict(name));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            session = %name,
            shortcut = %shortcut.key,
            dir = %provisioned.path.display(),
            "Launched session"
        );

        Ok(Session {
            shortcut_id: shortcut.id,
            mux_session: name,
            working_dir: provisioned.path,
            status: self.classify_live(shortcut).await,
        })
    }

    /// Current status of a shortcut's session; `Stopped` when none exists
    pub async fn status_for(&self, shortcut: &Shortcut) -> Result<SessionStatus, SessionError> {
        let name = session_name_for(shortcut.id);
        if !self.mux.has_session(&name).await? {
            return Ok(SessionStatus::Stopped);
        }
        Ok(self.classify_live(shortcut).await)
    }

    /// Kill a shortcut's session if it exists; returns whether one did
    pub async fn kill_for_shortcut(&self, shortcut: &Shortcut) -> Result<bool, SessionError> {
        let name = session_name_for(shortcut.id);
        if !self.mux.has_session(&name).await? {
            return Ok(false);
        }
        self.mux.kill_session(&name).await?;
        Ok(true)
    }

    /// Wrap a session that already exists. The working directory is
    /// re-derived through the provisioner, which reuses the existing
    /// worktree, so repeated lookups converge on the same answer.
    async fn wrap_existing(
        &self,
        shortcut: &Shortcut,
        name: String,
    ) -> Result<Session, SessionError> {
        let working_dir = if shortcut.use_worktree {
            self.provision(shortcut).await?.path
        } else {
            shortcut.project_path.clone()
        };
        Ok(Session {
            shortcut_id: shortcut.id,
            working_dir,
            status: self.classify_live(shortcut).await,
            mux_session: name,
        })
    }

    /// Run the blocking worktree resolution off the async control thread
    async fn provision(
        &self,
        shortcut: &Shortcut,
    ) -> Result<crate::git::Provisioned, SessionError> {
        let worktrees = self.worktrees.clone();
        let shortcut = shortcut.clone();
        Ok(tokio::task::spawn_blocking(move || worktrees.provision(&shortcut)).await??)
    }

    /// Classify a session known to exist. A failed capture degrades to
    /// liveness-only rather than failing the whole resolution.
    async fn classify_live(&self, shortcut: &Shortcut) -> SessionStatus {
        let name = session_name_for(shortcut.id);
        match self.mux.capture_pane(&name).await {
            Ok(pane) => classify(shortcut.tool, &pane, true),
            Err(e) => {
                tracing::warn!(session = %name, error = %e, "Pane capture failed");
                SessionStatus::Running
            }
        }
    }

    fn guard_for(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.guards
            .lock()
            .entry(id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

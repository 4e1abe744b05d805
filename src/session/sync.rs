//! Pull-based read model over storage and live sessions
//!
//! The interactive surface reads a consistent snapshot and calls `refresh()`
//! after any mutating operation; nothing here tracks dependencies
//! implicitly. Statuses are polled concurrently so one slow session cannot
//! hold up the rest.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::data::{Group, GroupStore, Shortcut, ShortcutStore};
use crate::status::SessionStatus;

use super::SessionManager;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// A consistent view of the catalog plus live session statuses
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub shortcuts: Vec<Shortcut>,
    pub groups: Vec<Group>,
    pub statuses: HashMap<Uuid, SessionStatus>,
}

/// Re-queries the session manager and storage into a snapshot for readers
pub struct Synchronizer {
    shortcuts: ShortcutStore,
    groups: GroupStore,
    manager: Arc<SessionManager>,
    current: RwLock<Snapshot>,
}

impl Synchronizer {
    pub fn new(shortcuts: ShortcutStore, groups: GroupStore, manager: Arc<SessionManager>) -> Self {
        Self {
            shortcuts,
            groups,
            manager,
            current: RwLock::new(Snapshot::default()),
        }
    }

    /// The most recently refreshed snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.current.read().clone()
    }

    /// Re-query storage and re-classify every session, then publish and
    /// return the new snapshot
    pub async fn refresh(&self) -> Result<Snapshot, SyncError> {
        let shortcuts = self.shortcuts.load_all()?;
        let groups = self.groups.load_all()?;

        let mut polls = tokio::task::JoinSet::new();
        for shortcut in shortcuts.clone() {
            let manager = self.manager.clone();
            polls.spawn(async move {
                let status = match manager.status_for(&shortcut).await {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::warn!(
                            shortcut = %shortcut.key,
                            error = %e,
                            "Status poll failed"
                        );
                        SessionStatus::Stopped
                    }
                };
                (shortcut.id, status)
            });
        }

        let mut statuses = HashMap::new();
        while let Some(result) = polls.join_next().await {
            if let Ok((id, status)) = result {
                statuses.insert(id, status);
            }
        }

        let snapshot = Snapshot {
            shortcuts,
            groups,
            statuses,
        };
        *self.current.write() = snapshot.clone();
        Ok(snapshot)
    }
}

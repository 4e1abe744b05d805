//! Session orchestration
//!
//! Maps a shortcut to exactly one live multiplexer session, creating the
//! worktree, session, and tool process at most once per shortcut — even
//! under concurrent requests. Sessions are runtime state only; nothing here
//! is persisted.

mod manager;
mod sync;

pub use manager::{Session, SessionError, SessionManager};
pub use sync::{Snapshot, SyncError, Synchronizer};

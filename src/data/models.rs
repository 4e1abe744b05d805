//! Data models for shortcuts and groups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::tool::Tool;

/// A persisted binding of a key to a tool invocation against a project.
///
/// The `id` is generated once at creation and never changes; the tmux session
/// name is derived from it, so a shortcut keeps its session across key
/// reassignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortcut {
    /// Unique identifier
    pub id: Uuid,
    /// Launch key (1-2 printable characters, unique among shortcuts)
    pub key: String,
    /// Display label
    pub name: String,
    /// Absolute path to the project directory
    pub project_path: PathBuf,
    /// Which tool the session runs
    pub tool: Tool,
    /// Extra arguments appended to the tool invocation
    pub cli_options: String,
    /// Slash-delimited path into the group tree; empty = ungrouped
    pub group_path: String,
    /// Pass the permission-skipping flag (claude only)
    pub skip_permissions: bool,
    /// Run the session inside a dedicated git worktree
    pub use_worktree: bool,
    /// Worktree branch name; empty means auto-generate
    pub worktree_branch: String,
    /// Base the worktree on `develop` instead of the current branch
    pub use_base_develop: bool,
    /// When the shortcut was created
    pub created_at: DateTime<Utc>,
    /// Stable sort position within its group
    pub order: i64,
}

impl Shortcut {
    /// Create a new shortcut with a fresh id and creation timestamp
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        project_path: PathBuf,
        tool: Tool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            name: name.into(),
            project_path,
            tool,
            cli_options: String::new(),
            group_path: String::new(),
            skip_permissions: false,
            use_worktree: false,
            worktree_branch: String::new(),
            use_base_develop: false,
            created_at: Utc::now(),
            order: 0,
        }
    }
}

/// A named node in the group tree, identified by its slash-delimited path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Full path, e.g. "work/backend"
    pub path: String,
    /// Final path segment, kept denormalized for display
    pub name: String,
}

impl Group {
    /// Create a group from its path; the name is the last segment
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self { path, name }
    }
}

//! Shortcut data access object

use super::models::Shortcut;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::tool::Tool;

/// Data access object for Shortcut operations
#[derive(Clone)]
pub struct ShortcutStore {
    conn: Arc<Mutex<Connection>>,
}

impl ShortcutStore {
    /// Create a new ShortcutStore
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert or update a shortcut, keyed by id.
    ///
    /// Uses INSERT OR REPLACE against both the id primary key and the unique
    /// key column: a save whose `key` collides with a different row's key
    /// silently displaces that row. Last key write wins — intentional,
    /// see DESIGN.md.
    pub fn save(&self, shortcut: &Shortcut) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO shortcuts (
                id, key, name, project_path, tool, cli_options, group_path,
                skip_permissions, use_worktree, worktree_branch, use_base_develop,
                created_at, sort_order
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                shortcut.id.to_string(),
                shortcut.key,
                shortcut.name,
                shortcut.project_path.to_string_lossy().to_string(),
                shortcut.tool.as_str(),
                shortcut.cli_options,
                shortcut.group_path,
                shortcut.skip_permissions as i32,
                shortcut.use_worktree as i32,
                shortcut.worktree_branch,
                shortcut.use_base_develop as i32,
                shortcut.created_at.to_rfc3339(),
                shortcut.order,
            ],
        )?;
        Ok(())
    }

    /// Load all shortcuts ordered by their sort position
    pub fn load_all(&self) -> SqliteResult<Vec<Shortcut>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM shortcuts ORDER BY sort_order, created_at"
        ))?;

        let shortcuts = stmt
            .query_map([], Self::row_to_shortcut)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(shortcuts)
    }

    /// Get a shortcut by id; None when absent
    pub fn get(&self, id: Uuid) -> SqliteResult<Option<Shortcut>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM shortcuts WHERE id = ?1"))?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_shortcut(row)?))
        } else {
            Ok(None)
        }
    }

    /// Get a shortcut by its launch key; None when absent
    pub fn get_by_key(&self, key: &str) -> SqliteResult<Option<Shortcut>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM shortcuts WHERE key = ?1"))?;

        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_shortcut(row)?))
        } else {
            Ok(None)
        }
    }

    /// Delete a shortcut; deleting an absent id is not an error
    pub fn delete(&self, id: Uuid) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM shortcuts WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Convert a database row to a Shortcut
    fn row_to_shortcut(row: &rusqlite::Row) -> SqliteResult<Shortcut> {
        let id_str: String = row.get(0)?;
        let path_str: String = row.get(3)?;
        let tool_str: String = row.get(4)?;
        let skip_permissions: i32 = row.get(7)?;
        let use_worktree: i32 = row.get(8)?;
        let use_base_develop: i32 = row.get(10)?;
        let created_at_str: String = row.get(11)?;

        Ok(Shortcut {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            key: row.get(1)?,
            name: row.get(2)?,
            project_path: PathBuf::from(path_str),
            tool: Tool::parse(&tool_str),
            cli_options: row.get(5)?,
            group_path: row.get(6)?,
            skip_permissions: skip_permissions != 0,
            use_worktree: use_worktree != 0,
            worktree_branch: row.get(9)?,
            use_base_develop: use_base_develop != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            order: row.get(12)?,
        })
    }
}

const COLUMNS: &str = "id, key, name, project_path, tool, cli_options, group_path, \
                       skip_permissions, use_worktree, worktree_branch, use_base_develop, \
                       created_at, sort_order";

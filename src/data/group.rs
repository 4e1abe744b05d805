//! Group data access object

use super::models::Group;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

/// Data access object for Group operations
#[derive(Clone)]
pub struct GroupStore {
    conn: Arc<Mutex<Connection>>,
}

impl GroupStore {
    /// Create a new GroupStore
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert or update a group, keyed by path
    pub fn save(&self, group: &Group) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO groups (path, name) VALUES (?1, ?2)",
            params![group.path, group.name],
        )?;
        Ok(())
    }

    /// Load all groups ordered by path
    pub fn load_all(&self) -> SqliteResult<Vec<Group>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT path, name FROM groups ORDER BY path")?;

        let groups = stmt
            .query_map([], |row| {
                Ok(Group {
                    path: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(groups)
    }

    /// Get a group by path; None when absent
    pub fn get(&self, path: &str) -> SqliteResult<Option<Group>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT path, name FROM groups WHERE path = ?1")?;

        let mut rows = stmt.query(params![path])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Group {
                path: row.get(0)?,
                name: row.get(1)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Delete a group; shortcuts under it keep their group_path and become
    /// visible as ungrouped until reassigned
    pub fn delete(&self, path: &str) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM groups WHERE path = ?1", params![path])?;
        Ok(())
    }

    /// Rename a group, rewriting the path prefix of every descendant group
    /// and of every shortcut under the subtree, in one transaction.
    pub fn rename(&self, old_path: &str, new_path: &str) -> SqliteResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let new_name = new_path.rsplit('/').next().unwrap_or(new_path);
        tx.execute(
            "UPDATE groups SET path = ?2, name = ?3 WHERE path = ?1",
            params![old_path, new_path, new_name],
        )?;
        tx.execute(
            "UPDATE groups SET path = ?2 || substr(path, length(?1) + 1)
             WHERE path LIKE ?1 || '/%'",
            params![old_path, new_path],
        )?;
        tx.execute(
            "UPDATE shortcuts SET group_path = ?2 || substr(group_path, length(?1) + 1)
             WHERE group_path = ?1 OR group_path LIKE ?1 || '/%'",
            params![old_path, new_path],
        )?;

        tx.commit()
    }
}

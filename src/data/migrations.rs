//! Database migrations using a versioned migration pattern.
//!
//! Each migration runs exactly once and is tracked in the `schema_migrations`
//! table. Migrations are applied in order by version number, so running them
//! at every startup is safe.

use rusqlite::{params, Connection};

/// A database migration with a version number, name, and SQL to execute.
pub struct Migration {
    /// Unique version number (migrations run in order)
    pub version: i64,
    /// Human-readable name for the migration
    pub name: &'static str,
    /// SQL to execute (can be multiple statements)
    pub sql: &'static str,
}

/// All migrations in order. New migrations should be added at the end.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_shortcuts_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS shortcuts (
                id TEXT PRIMARY KEY,
                key TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                project_path TEXT NOT NULL,
                tool TEXT NOT NULL,
                cli_options TEXT NOT NULL DEFAULT '',
                group_path TEXT NOT NULL DEFAULT '',
                skip_permissions INTEGER NOT NULL DEFAULT 0,
                use_worktree INTEGER NOT NULL DEFAULT 0,
                worktree_branch TEXT NOT NULL DEFAULT '',
                use_base_develop INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_shortcuts_group ON shortcuts(group_path);
        "#,
    },
    Migration {
        version: 2,
        name: "create_groups_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS groups (
                path TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );
        "#,
    },
];

/// Create the schema_migrations table if it doesn't exist.
fn ensure_migrations_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the set of already-applied migration versions.
fn get_applied_versions(conn: &Connection) -> rusqlite::Result<std::collections::HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<std::collections::HashSet<i64>>>()?;
    Ok(versions)
}

/// Run all pending migrations.
///
/// This is the main entry point for the migration system.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_versions(conn)?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        // Execute the migration SQL and record it within a single transaction
        let now = chrono::Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        if let Err(e) = tx.execute_batch(migration.sql) {
            tracing::error!(
                version = migration.version,
                name = migration.name,
                error = %e,
                "Migration failed"
            );
            return Err(e);
        }
        if let Err(e) = tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now],
        ) {
            tracing::error!(
                version = migration.version,
                name = migration.name,
                error = %e,
                "Migration failed"
            );
            return Err(e);
        }
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table],
            |row| row.get::<_, i64>(0).map(|c| c > 0),
        )
        .unwrap()
    }

    #[test]
    fn test_migrations_have_unique_versions() {
        let mut versions = std::collections::HashSet::new();
        for migration in MIGRATIONS {
            assert!(
                versions.insert(migration.version),
                "Duplicate migration version: {}",
                migration.version
            );
        }
    }

    #[test]
    fn test_migrations_are_ordered() {
        let mut last_version = 0;
        for migration in MIGRATIONS {
            assert!(
                migration.version > last_version,
                "Migrations must be in ascending order: {} should come after {}",
                migration.version,
                last_version
            );
            last_version = migration.version;
        }
    }

    #[test]
    fn test_fresh_database_migrations() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = get_applied_versions(&conn).unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());

        assert!(table_exists(&conn, "shortcuts"));
        assert!(table_exists(&conn, "groups"));
        assert!(table_exists(&conn, "schema_migrations"));
    }

    #[test]
    fn test_idempotent_migrations() {
        let mut conn = Connection::open_in_memory().unwrap();

        // Run migrations twice
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = get_applied_versions(&conn).unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
    }
}

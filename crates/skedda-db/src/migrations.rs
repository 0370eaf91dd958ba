//! Cache schema, versioned with `PRAGMA user_version`.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Schema steps; entry `n` upgrades a database from version `n` to `n + 1`.
const STEPS: &[&str] = &[
    // v1: venues and their spaces
    "CREATE TABLE venues (
        id      INTEGER PRIMARY KEY,
        name    TEXT NOT NULL,
        tenant  TEXT NOT NULL
    );
    CREATE TABLE spaces (
        id        INTEGER PRIMARY KEY,
        name      TEXT NOT NULL,
        venue_id  INTEGER NOT NULL REFERENCES venues(id)
    );
    CREATE INDEX idx_spaces_venue_id ON spaces(venue_id);",
];

/// Brings the schema up to date, one transaction per step.
///
/// # Errors
///
/// Returns an error if the stored version is newer than this build knows or
/// a step fails.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: usize = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version")?;

    if current > STEPS.len() {
        anyhow::bail!(
            "cache schema version {current} is newer than supported version {}",
            STEPS.len()
        );
    }

    for (from, sql) in STEPS.iter().enumerate().skip(current) {
        let to = from.saturating_add(1);
        let tx = conn
            .unchecked_transaction()
            .context("failed to begin migration")?;
        tx.execute_batch(sql)
            .with_context(|| format!("migration to v{to} failed"))?;
        tx.pragma_update(None, "user_version", to)
            .context("failed to update user_version")?;
        tx.commit().context("failed to commit migration")?;
        tracing::debug!(version = to, "Migrated cache schema");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn version(conn: &Connection) -> usize {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_latest() {
        // Arrange
        let conn = Connection::open_in_memory().unwrap();

        // Act
        run_migrations(&conn).unwrap();

        // Assert
        assert_eq!(version(&conn), STEPS.len());
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(tables, vec!["spaces", "venues"]);
    }

    #[test]
    fn test_rerun_is_noop() {
        // Arrange
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        // Act
        let result = run_migrations(&conn);

        // Assert
        assert!(result.is_ok());
        assert_eq!(version(&conn), STEPS.len());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        // Arrange
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();

        // Act
        let err = run_migrations(&conn).unwrap_err();

        // Assert
        assert!(err.to_string().contains("newer than supported"));
    }
}

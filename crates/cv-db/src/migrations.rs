//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.

use cv_core::{Error, Result};
use rusqlite::Connection;

/// V1: upload batches and per-file metadata.
const V1_INITIAL: &str = r#"
CREATE TABLE transactions (
    id         TEXT PRIMARY KEY,
    label      TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE file_metadata (
    id             TEXT PRIMARY KEY,
    size           INTEGER NOT NULL CHECK (size >= 0),
    content_type   TEXT NOT NULL,
    transaction_id TEXT NOT NULL REFERENCES transactions(id),
    created_at     TEXT NOT NULL
);
"#;

/// V2: lookup indexes for batch listing.
const V2_INDEXES: &str = r#"
CREATE INDEX idx_file_metadata_transaction ON file_metadata(transaction_id);
CREATE INDEX idx_file_metadata_created ON file_metadata(created_at, id);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_INDEXES)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        tracing::debug!("Applied migration V{version}");
    }

    Ok(())
}

/// Highest migration version recorded in `schema_migrations`.
pub fn current_version(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_idempotent() {
        let conn = fresh();
        // second call is a no-op
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_all_tables_created() {
        let conn = fresh();
        for t in ["transactions", "file_metadata", "schema_migrations"] {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
                    [t],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "table {t} should exist");
        }
    }

    #[test]
    fn test_negative_size_rejected() {
        let conn = fresh();
        conn.execute(
            "INSERT INTO transactions (id, created_at) VALUES ('t', 'now')",
            [],
        )
        .unwrap();
        let res = conn.execute(
            "INSERT INTO file_metadata (id, size, content_type, transaction_id, created_at)
             VALUES ('f', -1, 'video/mp4', 't', 'now')",
            [],
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_file_requires_transaction() {
        let conn = fresh();
        let res = conn.execute(
            "INSERT INTO file_metadata (id, size, content_type, transaction_id, created_at)
             VALUES ('f', 1, 'video/mp4', 'missing', 'now')",
            [],
        );
        assert!(res.is_err());
    }
}

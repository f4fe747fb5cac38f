//! File metadata CRUD and batch lookup.

use std::collections::BTreeSet;

use cv_core::{Error, FileId, Result, TransactionId};
use rusqlite::Connection;

use crate::models::FileMetadata;

/// Column list used in SELECT statements.
const COLS: &str = "id, size, content_type, transaction_id, created_at";

/// Upper bound on bound parameters per `IN (...)` query.
const LOOKUP_CHUNK: usize = 500;

/// Insert a metadata record. The referenced transaction must exist.
pub fn insert_file(conn: &Connection, meta: &FileMetadata) -> Result<()> {
    let size = i64::try_from(meta.size)
        .map_err(|_| Error::Validation(format!("file size {} is too large", meta.size)))?;

    conn.execute(
        "INSERT INTO file_metadata (id, size, content_type, transaction_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            meta.id.to_string(),
            size,
            meta.content_type,
            meta.transaction_id.to_string(),
            meta.created_at,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get a metadata record by ID.
pub fn get_file(conn: &Connection, id: FileId) -> Result<Option<FileMetadata>> {
    let q = format!("SELECT {COLS} FROM file_metadata WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], FileMetadata::from_row);
    match result {
        Ok(f) => Ok(Some(f)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Fetch every record whose ID is in `ids`.
///
/// Unknown IDs are skipped and duplicates collapse to one row. Rows come
/// back ordered by `created_at`, then `id`.
pub fn list_files_by_ids(conn: &Connection, ids: &[FileId]) -> Result<Vec<FileMetadata>> {
    let wanted: BTreeSet<String> = ids.iter().map(ToString::to_string).collect();
    let wanted: Vec<String> = wanted.into_iter().collect();

    let mut out = Vec::with_capacity(wanted.len());
    for chunk in wanted.chunks(LOOKUP_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let q = format!("SELECT {COLS} FROM file_metadata WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(chunk.iter()), FileMetadata::from_row)
            .map_err(|e| Error::database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::database(e.to_string()))?;
        out.extend(rows);
    }

    out.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
    });
    Ok(out)
}

/// List all records belonging to a batch, oldest first.
pub fn list_files_by_transaction(
    conn: &Connection,
    transaction_id: TransactionId,
) -> Result<Vec<FileMetadata>> {
    let q = format!(
        "SELECT {COLS} FROM file_metadata WHERE transaction_id = ?1
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([transaction_id.to_string()], FileMetadata::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a record. Returns whether a row was removed.
pub fn delete_file(conn: &Connection, id: FileId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM file_metadata WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

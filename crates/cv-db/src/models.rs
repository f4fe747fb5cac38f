//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use chrono::{SecondsFormat, Utc};
use cv_core::{FileId, TransactionId};
use uuid::Uuid;

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

/// Current time as a fixed-width RFC 3339 string.
///
/// Microsecond precision and a `Z` suffix keep lexicographic order equal to
/// chronological order, which `ORDER BY created_at` relies on.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A logical upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub label: Option<String>,
    pub created_at: String,
}

impl Transaction {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            label: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

// ---------------------------------------------------------------------------
// FileMetadata
// ---------------------------------------------------------------------------

/// Per-file record describing a stored payload.
///
/// `size` always equals the number of bytes committed to the byte store
/// under the same `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub id: FileId,
    pub size: u64,
    pub content_type: String,
    pub transaction_id: TransactionId,
    pub created_at: String,
}

impl FileMetadata {
    /// Build a record stamped with the current time.
    pub fn new(
        id: FileId,
        size: u64,
        content_type: impl Into<String>,
        transaction_id: TransactionId,
    ) -> Self {
        Self {
            id,
            size,
            content_type: content_type.into(),
            transaction_id,
            created_at: timestamp_now(),
        }
    }

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let size: i64 = row.get(1)?;
        let size = u64::try_from(size).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Integer, Box::new(e))
        })?;
        Ok(Self {
            id: parse_id(row, 0)?,
            size,
            content_type: row.get(2)?,
            transaction_id: parse_id(row, 3)?,
            created_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_chronologically() {
        let a = timestamp_now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = timestamp_now();
        assert!(a < b);
        assert!(a.ends_with('Z'));
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn new_file_metadata() {
        let id = FileId::new();
        let tx = TransactionId::new();
        let meta = FileMetadata::new(id, 42, "video/mp4", tx);
        assert_eq!(meta.id, id);
        assert_eq!(meta.size, 42);
        assert_eq!(meta.transaction_id, tx);
        assert!(!meta.created_at.is_empty());
    }
}

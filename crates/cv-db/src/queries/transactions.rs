//! Upload batch (transaction) operations.

use cv_core::{Error, Result, TransactionId};
use rusqlite::Connection;

use crate::models::{timestamp_now, Transaction};

/// Create a new, empty upload batch.
pub fn create_transaction(conn: &Connection, label: Option<&str>) -> Result<Transaction> {
    let id = TransactionId::new();
    let now = timestamp_now();
    let label = label.map(str::trim).filter(|l| !l.is_empty());

    conn.execute(
        "INSERT INTO transactions (id, label, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![id.to_string(), label, &now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Transaction {
        id,
        label: label.map(String::from),
        created_at: now,
    })
}

/// Get a batch by ID.
pub fn get_transaction(conn: &Connection, id: TransactionId) -> Result<Option<Transaction>> {
    let result = conn.query_row(
        "SELECT id, label, created_at FROM transactions WHERE id = ?1",
        [id.to_string()],
        Transaction::from_row,
    );
    match result {
        Ok(t) => Ok(Some(t)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

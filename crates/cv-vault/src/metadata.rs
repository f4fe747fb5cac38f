//! Per-file metadata persistence.

use async_trait::async_trait;
use cv_core::{Error, FileId, Result};
use cv_db::models::FileMetadata;
use cv_db::pool::{get_conn, DbPool};
use cv_db::queries::files;
use rusqlite::Connection;

/// Persists and retrieves [`FileMetadata`] records keyed by file ID.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new record.
    async fn save(&self, meta: &FileMetadata) -> Result<()>;

    /// Remove a record. Returns whether one existed.
    async fn delete(&self, id: FileId) -> Result<bool>;

    async fn find_by_id(&self, id: FileId) -> Result<Option<FileMetadata>>;

    /// Batch lookup. Unknown IDs are skipped; rows are ordered by
    /// `created_at`, then `id`.
    async fn find_all_by_ids(&self, ids: &[FileId]) -> Result<Vec<FileMetadata>>;
}

/// [`MetadataStore`] over the SQLite pool.
///
/// rusqlite is synchronous, so every call runs on the blocking thread pool.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: DbPool,
}

impl SqliteMetadataStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn save(&self, meta: &FileMetadata) -> Result<()> {
        let meta = meta.clone();
        self.with_conn(move |conn| files::insert_file(conn, &meta)).await
    }

    async fn delete(&self, id: FileId) -> Result<bool> {
        self.with_conn(move |conn| files::delete_file(conn, id)).await
    }

    async fn find_by_id(&self, id: FileId) -> Result<Option<FileMetadata>> {
        self.with_conn(move |conn| files::get_file(conn, id)).await
    }

    async fn find_all_by_ids(&self, ids: &[FileId]) -> Result<Vec<FileMetadata>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| files::list_files_by_ids(conn, &ids))
            .await
    }
}

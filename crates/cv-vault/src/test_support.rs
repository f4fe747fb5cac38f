//! Fault-injecting store wrappers for saga and fetcher tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use cv_core::{Error, FileId, Result, TransactionId};
use cv_db::models::FileMetadata;
use cv_db::pool::init_memory_pool;
use cv_db::queries::transactions;
use cv_storage::{ByteStore, ByteStream, MemoryStore};
use tokio::sync::Notify;

use crate::metadata::{MetadataStore, SqliteMetadataStore};

/// Fresh SQLite metadata store plus one batch to upload into.
pub fn sqlite_metadata() -> (SqliteMetadataStore, TransactionId) {
    let pool = init_memory_pool().unwrap();
    let tx = transactions::create_transaction(&pool.get().unwrap(), Some("test")).unwrap();
    (SqliteMetadataStore::new(pool), tx.id)
}

/// Payload of `size` bytes where byte `i` is `i % 251`.
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

fn injected(op: &str) -> Error {
    Error::Internal(format!("injected {op} failure"))
}

/// Wraps a [`MetadataStore`], failing selected calls.
pub struct FlakyMetadata<M> {
    pub inner: M,
    /// Fail the n-th `save` (1-based).
    pub fail_save_on: Option<usize>,
    pub fail_delete: bool,
    pub fail_find: bool,
    pub(crate) saves: AtomicUsize,
}

impl<M> FlakyMetadata<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            fail_save_on: None,
            fail_delete: false,
            fail_find: false,
            saves: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<M: MetadataStore> MetadataStore for FlakyMetadata<M> {
    async fn save(&self, meta: &FileMetadata) -> Result<()> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_save_on == Some(n) {
            return Err(injected("metadata save"));
        }
        self.inner.save(meta).await
    }

    async fn delete(&self, id: FileId) -> Result<bool> {
        if self.fail_delete {
            return Err(injected("metadata delete"));
        }
        self.inner.delete(id).await
    }

    async fn find_by_id(&self, id: FileId) -> Result<Option<FileMetadata>> {
        if self.fail_find {
            return Err(injected("metadata find"));
        }
        self.inner.find_by_id(id).await
    }

    async fn find_all_by_ids(&self, ids: &[FileId]) -> Result<Vec<FileMetadata>> {
        if self.fail_find {
            return Err(injected("metadata find"));
        }
        self.inner.find_all_by_ids(ids).await
    }
}

/// Wraps a [`MemoryStore`], failing selected calls.
#[derive(Default)]
pub struct FlakyBytes {
    pub inner: MemoryStore,
    /// Fail the n-th `write` (1-based) without storing anything.
    pub fail_write_on: Option<usize>,
    /// Report one byte fewer than stored for the n-th `write`.
    pub short_count_on: Option<usize>,
    pub fail_delete: bool,
    /// Return fewer bytes than requested from `read`.
    pub truncate_reads: bool,
    pub(crate) writes: AtomicUsize,
}

#[async_trait]
impl ByteStore for FlakyBytes {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn write(&self, id: FileId, body: ByteStream) -> Result<u64> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_write_on == Some(n) {
            drop(body);
            return Err(injected("bytes write"));
        }
        let written = self.inner.write(id, body).await?;
        if self.short_count_on == Some(n) {
            return Ok(written.saturating_sub(1));
        }
        Ok(written)
    }

    async fn read(&self, id: FileId, offset: u64, length: u64) -> Result<Bytes> {
        let bytes = self.inner.read(id, offset, length).await?;
        if self.truncate_reads && !bytes.is_empty() {
            return Ok(bytes.slice(..bytes.len() - 1));
        }
        Ok(bytes)
    }

    async fn delete(&self, id: FileId) -> Result<bool> {
        if self.fail_delete {
            return Err(injected("bytes delete"));
        }
        self.inner.delete(id).await
    }

    async fn exists(&self, id: FileId) -> Result<bool> {
        self.inner.exists(id).await
    }
}

/// Wraps a [`MemoryStore`] whose `write` blocks until released.
#[derive(Default)]
pub struct GatedBytes {
    pub inner: MemoryStore,
    /// Fail the write once released instead of storing it.
    pub fail: bool,
    /// Signalled when a write starts waiting.
    pub started: Notify,
    /// Release one waiting write.
    pub gate: Notify,
}

#[async_trait]
impl ByteStore for GatedBytes {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn write(&self, id: FileId, body: ByteStream) -> Result<u64> {
        self.started.notify_one();
        self.gate.notified().await;
        if self.fail {
            return Err(injected("bytes write"));
        }
        self.inner.write(id, body).await
    }

    async fn read(&self, id: FileId, offset: u64, length: u64) -> Result<Bytes> {
        self.inner.read(id, offset, length).await
    }

    async fn delete(&self, id: FileId) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn exists(&self, id: FileId) -> Result<bool> {
        self.inner.exists(id).await
    }
}

/// Poll `check` until it holds, failing the test after about two seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

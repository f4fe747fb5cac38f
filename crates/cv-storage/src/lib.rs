//! cv-storage: raw byte storage for uploaded media.
//!
//! A [`ByteStore`] addresses payloads by [`FileId`] and supports writing a
//! whole stream and reading arbitrary sub-ranges back. Two backends ship
//! with the crate: [`FilesystemStore`] for production and [`MemoryStore`]
//! for tests and ephemeral deployments.

pub mod filesystem;
pub mod memory;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cv_core::config::{StorageBackend, StorageConfig};
use cv_core::{FileId, Result};
use futures::Stream;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

/// A stream of payload chunks, as produced by an upload body.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn stream_from_bytes(bytes: impl Into<Bytes>) -> ByteStream {
    let bytes = bytes.into();
    Box::pin(futures::stream::once(async move { Ok(bytes) }))
}

/// Key-addressed raw byte storage.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Short backend name for logs (e.g. "filesystem").
    fn name(&self) -> &'static str;

    /// Consume `body` and store it under `id`, returning the number of bytes
    /// committed. A payload is only visible once the whole stream is stored.
    async fn write(&self, id: FileId, body: ByteStream) -> Result<u64>;

    /// Read exactly `length` bytes starting at `offset`.
    ///
    /// Fails with `NotFound` when no payload exists and with a storage
    /// failure when the payload ends before `offset + length`.
    async fn read(&self, id: FileId, offset: u64, length: u64) -> Result<Bytes>;

    /// Like [`ByteStore::read`], but yields the range as a stream.
    ///
    /// Missing payloads and out-of-bounds ranges fail here, before any
    /// chunk is produced. Backends that can read incrementally override
    /// this; the default buffers the whole range with `read`.
    async fn read_stream(&self, id: FileId, offset: u64, length: u64) -> Result<ByteStream> {
        Ok(stream_from_bytes(self.read(id, offset, length).await?))
    }

    /// Remove the payload. Returns whether anything was deleted.
    async fn delete(&self, id: FileId) -> Result<bool>;

    /// Whether a complete payload exists under `id`.
    async fn exists(&self, id: FileId) -> Result<bool>;
}

/// Build the configured backend.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn ByteStore>> {
    let store: Arc<dyn ByteStore> = match config.backend {
        StorageBackend::Filesystem => Arc::new(FilesystemStore::open(&config.root).await?),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    tracing::info!("Byte store ready: {}", store.name());
    Ok(store)
}

/// Error for a read that extends past the stored payload.
pub(crate) fn short_read(id: FileId, offset: u64, length: u64, available: u64) -> cv_core::Error {
    cv_core::Error::storage(
        "bytes.read",
        Some(id),
        format!("short read: wanted {length} byte(s) at offset {offset}, payload has {available}"),
    )
}

//! cv-vault: the storage core of clipvault.
//!
//! Ties a [`MetadataStore`] and a [`ByteStore`] together:
//!
//! - [`UploadCoordinator`] ingests batches of files atomically across both
//!   stores, compensating on failure.
//! - [`ChunkFetcher`] resolves a byte range against a file's recorded size
//!   and reads exactly those bytes.
//! - [`Vault`] bundles both behind one cheaply clonable handle.

pub mod fetch;
pub mod ids;
pub mod metadata;
pub mod upload;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use cv_core::{Error, FileId, RangeSpec, Result, TransactionId};
use cv_db::models::FileMetadata;
use cv_storage::ByteStore;

pub use fetch::{Chunk, ChunkFetcher, ChunkStream};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use metadata::{MetadataStore, SqliteMetadataStore};
pub use upload::{UploadCoordinator, UploadFile};

/// Upload and retrieval over one pair of stores.
#[derive(Clone)]
pub struct Vault {
    metadata: Arc<dyn MetadataStore>,
    bytes: Arc<dyn ByteStore>,
    uploads: UploadCoordinator,
    fetcher: ChunkFetcher,
}

impl Vault {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        bytes: Arc<dyn ByteStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            uploads: UploadCoordinator::new(metadata.clone(), bytes.clone(), ids),
            fetcher: ChunkFetcher::new(metadata.clone(), bytes.clone()),
            metadata,
            bytes,
        }
    }

    /// Store a batch of files atomically. See [`UploadCoordinator::save`].
    pub async fn save(
        &self,
        files: Vec<UploadFile>,
        transaction: TransactionId,
    ) -> Result<Vec<FileId>> {
        self.uploads.save(files, transaction).await
    }

    /// Read the bytes `spec` selects. See [`ChunkFetcher::fetch_chunk`].
    pub async fn fetch_chunk(&self, id: FileId, spec: &RangeSpec) -> Result<Chunk> {
        self.fetcher.fetch_chunk(id, spec).await
    }

    /// Stream the bytes `spec` selects. See [`ChunkFetcher::open_chunk`].
    pub async fn open_chunk(&self, id: FileId, spec: &RangeSpec) -> Result<ChunkStream> {
        self.fetcher.open_chunk(id, spec).await
    }

    /// Metadata for one file, without touching the byte store.
    pub async fn find_by_id(&self, id: FileId) -> Result<FileMetadata> {
        self.metadata
            .find_by_id(id)
            .await
            .map_err(|e| e.into_storage_failure("metadata.find_by_id", Some(id)))?
            .ok_or_else(|| Error::not_found("file", id))
    }

    /// Metadata for every known ID in `ids`, ordered by creation time.
    pub async fn find_all_by_ids(&self, ids: &[FileId]) -> Result<Vec<FileMetadata>> {
        self.metadata
            .find_all_by_ids(ids)
            .await
            .map_err(|e| e.into_storage_failure("metadata.find_all_by_ids", None::<FileId>))
    }

    /// Name of the byte store backend.
    pub fn byte_store_name(&self) -> &'static str {
        self.bytes.name()
    }
}

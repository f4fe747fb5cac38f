//! Ranged chunk retrieval.

use std::sync::Arc;

use bytes::Bytes;
use cv_core::{Error, FileId, RangeSpec, ResolvedRange, Result};
use cv_db::models::FileMetadata;
use cv_storage::{ByteStore, ByteStream};

use crate::metadata::MetadataStore;

/// The bytes of one resolved range, plus the file they came from.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub metadata: FileMetadata,
    pub bytes: Bytes,
    pub range: ResolvedRange,
}

impl Chunk {
    /// Whether the chunk covers less than the whole file.
    pub fn is_partial(&self) -> bool {
        !self.range.is_full(self.metadata.size)
    }

    /// `Content-Range` value for this chunk.
    pub fn content_range(&self) -> String {
        self.range.content_range(self.metadata.size)
    }
}

/// A resolved range whose bytes are still to be read from the store.
pub struct ChunkStream {
    pub metadata: FileMetadata,
    pub range: ResolvedRange,
    /// Exactly `range.len()` bytes.
    pub body: ByteStream,
}

impl ChunkStream {
    pub fn is_partial(&self) -> bool {
        !self.range.is_full(self.metadata.size)
    }

    pub fn content_range(&self) -> String {
        self.range.content_range(self.metadata.size)
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("metadata", &self.metadata)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

/// Resolves ranges against stored metadata and reads the matching bytes.
#[derive(Clone)]
pub struct ChunkFetcher {
    metadata: Arc<dyn MetadataStore>,
    bytes: Arc<dyn ByteStore>,
}

impl ChunkFetcher {
    pub fn new(metadata: Arc<dyn MetadataStore>, bytes: Arc<dyn ByteStore>) -> Self {
        Self { metadata, bytes }
    }

    /// Fetch the bytes `spec` selects from file `id`.
    ///
    /// Unknown IDs are `NotFound`; unsatisfiable ranges are `InvalidRange`.
    /// A payload that is missing or shorter than its metadata claims is a
    /// storage failure.
    pub async fn fetch_chunk(&self, id: FileId, spec: &RangeSpec) -> Result<Chunk> {
        let (metadata, range) = self.locate(id, spec).await?;

        let bytes = self
            .bytes
            .read(id, range.start, range.len())
            .await
            .map_err(|e| read_failure(e, id))?;

        if bytes.len() as u64 != range.len() {
            return Err(Error::storage(
                "bytes.read",
                Some(id),
                format!(
                    "short read: wanted {} byte(s) at offset {}, got {}",
                    range.len(),
                    range.start,
                    bytes.len()
                ),
            ));
        }

        tracing::trace!(
            "Fetched {} of {id}",
            range.content_range(metadata.size)
        );

        Ok(Chunk {
            metadata,
            bytes,
            range,
        })
    }

    /// Like [`ChunkFetcher::fetch_chunk`], but leaves the bytes in the store
    /// and returns a stream over them. Every error `fetch_chunk` can raise
    /// before reading is raised here too, so callers can still pick a status
    /// code before sending anything.
    pub async fn open_chunk(&self, id: FileId, spec: &RangeSpec) -> Result<ChunkStream> {
        let (metadata, range) = self.locate(id, spec).await?;

        let body = self
            .bytes
            .read_stream(id, range.start, range.len())
            .await
            .map_err(|e| read_failure(e, id))?;

        tracing::trace!(
            "Streaming {} of {id}",
            range.content_range(metadata.size)
        );

        Ok(ChunkStream {
            metadata,
            range,
            body,
        })
    }

    async fn locate(&self, id: FileId, spec: &RangeSpec) -> Result<(FileMetadata, ResolvedRange)> {
        let metadata = self
            .metadata
            .find_by_id(id)
            .await
            .map_err(|e| e.into_storage_failure("metadata.find_by_id", Some(id)))?
            .ok_or_else(|| Error::not_found("file", id))?;

        let range = spec.resolve(metadata.size)?;
        Ok((metadata, range))
    }
}

/// A payload missing behind existing metadata is a store fault, not a 404.
fn read_failure(e: Error, id: FileId) -> Error {
    match e {
        Error::NotFound { .. } => Error::storage("bytes.read", Some(id), e),
        other => other.into_storage_failure("bytes.read", Some(id)),
    }
}

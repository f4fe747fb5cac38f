//! Atomic multi-file ingestion.
//!
//! [`UploadCoordinator::save`] runs a batch as a compensable saga: every
//! completed store mutation is recorded in a ledger, and the first failure
//! replays the ledger backwards with compensating deletes before the error
//! is returned. The metadata and byte stores share no transaction, so this
//! ledger is the only thing keeping them consistent.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use cv_core::media::DEFAULT_CONTENT_TYPE;
use cv_core::{Error, FileId, Result, TransactionId};
use cv_db::models::FileMetadata;
use cv_storage::{stream_from_bytes, ByteStore, ByteStream};

use crate::ids::IdGenerator;
use crate::metadata::MetadataStore;

/// One file of an upload batch.
pub struct UploadFile {
    pub body: ByteStream,
    pub content_type: String,
    /// Number of bytes the client says `body` will yield.
    pub declared_size: u64,
}

impl UploadFile {
    pub fn new(body: ByteStream, content_type: impl Into<String>, declared_size: u64) -> Self {
        Self {
            body,
            content_type: content_type.into(),
            declared_size,
        }
    }

    /// A file whose payload is already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(stream_from_bytes(bytes), content_type, size)
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("content_type", &self.content_type)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// A completed mutation that rollback must undo.
#[derive(Debug, Clone, Copy)]
enum Step {
    Metadata(FileId),
    Bytes(FileId),
}

/// Coordinates metadata and byte writes for upload batches.
#[derive(Clone)]
pub struct UploadCoordinator {
    metadata: Arc<dyn MetadataStore>,
    bytes: Arc<dyn ByteStore>,
    ids: Arc<dyn IdGenerator>,
}

impl UploadCoordinator {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        bytes: Arc<dyn ByteStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            metadata,
            bytes,
            ids,
        }
    }

    /// Store every file of a batch, returning their IDs in input order.
    ///
    /// Either all files are stored or none are: on failure every metadata
    /// row and payload already written for the batch is removed before the
    /// error is returned. If that cleanup itself fails the error is
    /// [`Error::RollbackIncomplete`] listing the IDs left behind.
    ///
    /// The batch runs on its own task. Dropping the returned future (a
    /// client disconnect, a timeout) detaches from it but does not stop it,
    /// so the batch still ends either fully stored or fully rolled back.
    pub async fn save(
        &self,
        files: Vec<UploadFile>,
        transaction: TransactionId,
    ) -> Result<Vec<FileId>> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.run_batch(files, transaction).await })
            .await
            .map_err(|e| Error::Internal(format!("upload task for batch {transaction} failed: {e}")))?
    }

    async fn run_batch(
        &self,
        files: Vec<UploadFile>,
        transaction: TransactionId,
    ) -> Result<Vec<FileId>> {
        let total = files.len();
        let mut ledger: Vec<Step> = Vec::with_capacity(total * 2);
        let mut seen: HashSet<FileId> = HashSet::with_capacity(total);
        let mut ids = Vec::with_capacity(total);

        for (index, file) in files.into_iter().enumerate() {
            match self
                .save_one(file, transaction, &mut seen, &mut ledger)
                .await
            {
                Ok(id) => {
                    tracing::debug!(
                        "Stored file {}/{total} of batch {transaction} as {id}",
                        index + 1
                    );
                    ids.push(id);
                }
                Err(cause) => {
                    tracing::warn!(
                        "Upload of file {}/{total} in batch {transaction} failed: {cause}; rolling back {} step(s)",
                        index + 1,
                        ledger.len()
                    );
                    return Err(self.compensate(cause, &ledger).await);
                }
            }
        }

        Ok(ids)
    }

    async fn save_one(
        &self,
        file: UploadFile,
        transaction: TransactionId,
        seen: &mut HashSet<FileId>,
        ledger: &mut Vec<Step>,
    ) -> Result<FileId> {
        let id = self.ids.next_id();
        if !seen.insert(id) {
            return Err(Error::storage(
                "id.generate",
                Some(id),
                "identifier already used in this batch",
            ));
        }

        let content_type = match file.content_type.trim() {
            "" => DEFAULT_CONTENT_TYPE.to_string(),
            ct => ct.to_string(),
        };
        let meta = FileMetadata::new(id, file.declared_size, content_type, transaction);

        self.metadata
            .save(&meta)
            .await
            .map_err(|e| e.into_storage_failure("metadata.save", Some(id)))?;
        ledger.push(Step::Metadata(id));

        // Recorded before the write: a failed write may still leave bytes.
        ledger.push(Step::Bytes(id));
        let written = self
            .bytes
            .write(id, file.body)
            .await
            .map_err(|e| e.into_storage_failure("bytes.write", Some(id)))?;

        if written != file.declared_size {
            return Err(Error::storage(
                "bytes.write",
                Some(id),
                format!(
                    "committed {written} byte(s) but {} were declared",
                    file.declared_size
                ),
            ));
        }

        Ok(id)
    }

    /// Undo `ledger` newest-first and fold the outcome into the error.
    async fn compensate(&self, cause: Error, ledger: &[Step]) -> Error {
        let mut pending: Vec<String> = Vec::new();

        for step in ledger.iter().rev() {
            let (id, result) = match *step {
                Step::Bytes(id) => (id, self.bytes.delete(id).await),
                Step::Metadata(id) => (id, self.metadata.delete(id).await),
            };
            if let Err(e) = result {
                tracing::warn!("Rollback of {step:?} failed: {e}");
                let id = id.to_string();
                if !pending.contains(&id) {
                    pending.push(id);
                }
            }
        }

        if pending.is_empty() {
            cause
        } else {
            Error::RollbackIncomplete {
                cause: Box::new(cause),
                pending,
            }
        }
    }
}

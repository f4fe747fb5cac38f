//! Filesystem-backed byte store.
//!
//! Payloads live at `{root}/{first two chars of id}/{id}`. Writes go to a
//! hidden `.{id}.partial` sibling that is flushed, fsynced and renamed into
//! place, so the final path only ever holds a complete payload.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use cv_core::{Error, FileId, Result};
use futures::StreamExt;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::{short_read, ByteStore, ByteStream};

/// Read buffer for streamed range reads.
const READ_CHUNK: usize = 64 * 1024;

/// Stores each payload as a file under a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_dir(&self, id: FileId) -> PathBuf {
        self.root.join(id.shard())
    }

    /// Final location of the payload for `id`.
    pub fn path_for(&self, id: FileId) -> PathBuf {
        self.shard_dir(id).join(id.to_string())
    }

    fn partial_path_for(&self, id: FileId) -> PathBuf {
        self.shard_dir(id).join(format!(".{id}.partial"))
    }

    /// Open the payload positioned at `offset`, checking that
    /// `offset + length` lies within it. Returns the file and its length.
    async fn open_range(&self, id: FileId, offset: u64, length: u64) -> Result<(fs::File, u64)> {
        let path = self.path_for(id);
        let mut file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found("payload", id));
            }
            Err(e) => return Err(e.into()),
        };

        let available = file.metadata().await?.len();
        let end = offset
            .checked_add(length)
            .ok_or_else(|| short_read(id, offset, length, available))?;
        if end > available {
            return Err(short_read(id, offset, length, available));
        }

        file.seek(SeekFrom::Start(offset)).await?;
        Ok((file, available))
    }

    async fn write_partial(&self, partial: &Path, mut body: ByteStream) -> Result<u64> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(partial)
            .await?;

        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl ByteStore for FilesystemStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn write(&self, id: FileId, body: ByteStream) -> Result<u64> {
        let target = self.path_for(id);
        if fs::try_exists(&target).await? {
            return Err(Error::storage(
                "bytes.write",
                Some(id),
                "a payload already exists under this id",
            ));
        }

        fs::create_dir_all(self.shard_dir(id)).await?;
        let partial = self.partial_path_for(id);

        match self.write_partial(&partial, body).await {
            Ok(written) => {
                if let Err(e) = fs::rename(&partial, &target).await {
                    let _ = fs::remove_file(&partial).await;
                    return Err(e.into());
                }
                tracing::debug!("Stored {written} byte(s) at {}", target.display());
                Ok(written)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            "Failed to remove partial file {}: {cleanup}",
                            partial.display()
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn read(&self, id: FileId, offset: u64, length: u64) -> Result<Bytes> {
        let (mut file, available) = self.open_range(id, offset, length).await?;
        if length == 0 {
            return Ok(Bytes::new());
        }

        let len = usize::try_from(length)
            .map_err(|_| Error::storage("bytes.read", Some(id), "range too large for memory"))?;

        let mut buf = BytesMut::zeroed(len);
        match file.read_exact(&mut buf).await {
            Ok(_) => Ok(buf.freeze()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(short_read(id, offset, length, available))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_stream(&self, id: FileId, offset: u64, length: u64) -> Result<ByteStream> {
        let (file, _) = self.open_range(id, offset, length).await?;
        let stream: ByteStream = Box::pin(ReaderStream::with_capacity(file.take(length), READ_CHUNK));
        Ok(stream)
    }

    async fn delete(&self, id: FileId) -> Result<bool> {
        let _ = fs::remove_file(self.partial_path_for(id)).await;
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: FileId) -> Result<bool> {
        Ok(fs::try_exists(self.path_for(id)).await?)
    }
}

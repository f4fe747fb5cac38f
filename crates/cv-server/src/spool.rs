//! Spooling of multipart parts to anonymous temp files.
//!
//! Multipart fields can only be read one after another, while the upload
//! coordinator wants every body of a batch up front. Each part is copied to
//! an unlinked temp file while its bytes are counted; the count becomes the
//! declared size and the file is streamed back into the byte store.

use std::io::SeekFrom;
use std::path::Path;

use bytes::Bytes;
use cv_core::{Error, Result};
use cv_vault::UploadFile;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// Read buffer used when streaming a spooled part back out.
const READ_CHUNK: usize = 64 * 1024;

/// One part, fully written to disk.
#[derive(Debug)]
pub struct SpooledPart {
    file: tokio::fs::File,
    size: u64,
    content_type: String,
}

impl SpooledPart {
    /// Bytes received for this part.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Hand the part to the upload coordinator.
    pub fn into_upload_file(self) -> UploadFile {
        let body = ReaderStream::with_capacity(self.file, READ_CHUNK);
        UploadFile::new(Box::pin(body), self.content_type, self.size)
    }
}

/// Copy `body` into a temp file under `dir` (or the system temp dir).
pub async fn spool<S, E>(
    body: S,
    content_type: String,
    dir: Option<&Path>,
) -> Result<SpooledPart>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let dir = dir.map(Path::to_path_buf);
    let std_file = tokio::task::spawn_blocking(move || match dir {
        Some(dir) => tempfile::tempfile_in(dir),
        None => tempfile::tempfile(),
    })
    .await
    .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))??;
    let mut file = tokio::fs::File::from_std(std_file);

    let mut size: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::Validation(format!("failed to read upload: {e}")))?;
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;

    Ok(SpooledPart {
        file,
        size,
        content_type,
    })
}

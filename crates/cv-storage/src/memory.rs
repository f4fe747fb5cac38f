//! In-memory byte store.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use cv_core::{Error, FileId, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::StreamExt;

use crate::{short_read, ByteStore, ByteStream};

/// Keeps every payload in a concurrent map. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    payloads: DashMap<FileId, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

#[async_trait]
impl ByteStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn write(&self, id: FileId, mut body: ByteStream) -> Result<u64> {
        if self.payloads.contains_key(&id) {
            return Err(Error::storage(
                "bytes.write",
                Some(id),
                "a payload already exists under this id",
            ));
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let written = buf.len() as u64;

        match self.payloads.entry(id) {
            Entry::Occupied(_) => Err(Error::storage(
                "bytes.write",
                Some(id),
                "a payload already exists under this id",
            )),
            Entry::Vacant(slot) => {
                slot.insert(buf.freeze());
                Ok(written)
            }
        }
    }

    async fn read(&self, id: FileId, offset: u64, length: u64) -> Result<Bytes> {
        let payload = self
            .payloads
            .get(&id)
            .map(|p| p.value().clone())
            .ok_or_else(|| Error::not_found("payload", id))?;

        let available = payload.len() as u64;
        match offset.checked_add(length) {
            Some(end) if end <= available => Ok(payload.slice(offset as usize..end as usize)),
            _ => Err(short_read(id, offset, length, available)),
        }
    }

    async fn delete(&self, id: FileId) -> Result<bool> {
        Ok(self.payloads.remove(&id).is_some())
    }

    async fn exists(&self, id: FileId) -> Result<bool> {
        Ok(self.payloads.contains_key(&id))
    }
}

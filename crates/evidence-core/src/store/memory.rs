//! In-memory content store.

use super::{chunked, not_found, verify, ChunkStream, ContentId, ContentStore};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::Result;
use crate::logging::RedactedHex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Content store backed by a shared map. Clones share the same blobs.
#[derive(Clone)]
pub struct MemoryContentStore {
    blobs: Arc<RwLock<HashMap<ContentId, Vec<u8>>>>,
    chunk_size: usize,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }
}

impl MemoryContentStore {
    /// Create a store that yields chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            chunk_size,
        }
    }

    /// Number of distinct blobs stored.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Whether nothing has been stored yet.
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Overwrite the bytes under `id`, bypassing content addressing.
    /// Lets tests simulate a corrupted or malicious store.
    pub async fn replace_raw(&self, id: &ContentId, bytes: Vec<u8>) {
        self.blobs.write().await.insert(id.clone(), bytes);
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentId> {
        let id = ContentId::for_content(&bytes);
        debug!(content_id = %RedactedHex(id.as_str()), size = bytes.len(), "Pinned blob");
        self.blobs.write().await.entry(id.clone()).or_insert(bytes);
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<ChunkStream> {
        let data = self
            .blobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))?;
        verify(id, &data)?;
        Ok(chunked(data, self.chunk_size))
    }
}

//! Content-addressed blob storage.
//!
//! The store only ever sees sealed payloads. Identifiers are derived from
//! the stored bytes, so they are immutable once produced and identical
//! bytes always map to the same id. Nothing is ever deleted.

mod memory;
mod sqlite;

pub use memory::MemoryContentStore;
pub use sqlite::SqliteContentStore;

use crate::crypto::data_hash;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of identifiers produced by the bundled stores.
pub const CONTENT_ID_PREFIX: &str = "bafk";

/// Opaque handle returned by [`ContentStore::put`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an identifier issued by a store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier the bundled stores assign to `data`.
    pub fn for_content(data: &[u8]) -> Self {
        Self(format!("{}{}", CONTENT_ID_PREFIX, data_hash(data)))
    }

    /// Whether `data` is the content this id was derived from.
    pub fn matches(&self, data: &[u8]) -> bool {
        *self == Self::for_content(data)
    }

    /// The identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (legacy ledger rows without content).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lazy sequence of byte chunks returned by [`ContentStore::get`].
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

/// Capability set of a content-addressed store.
///
/// Timeouts belong to the implementation; callers never retry implicitly.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes`, returning their identifier.
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentId>;

    /// Stream the bytes stored under `id`.
    async fn get(&self, id: &ContentId) -> Result<ChunkStream>;
}

/// Fetch every chunk under `id` and concatenate them.
pub async fn read_all<S>(store: &S, id: &ContentId) -> Result<Vec<u8>>
where
    S: ContentStore + ?Sized,
{
    let mut chunks = store.get(id).await?;
    let mut buffer = Vec::new();
    while let Some(chunk) = chunks.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer)
}

/// Split `data` into owned chunks of at most `chunk_size` bytes.
pub(crate) fn chunked(data: Vec<u8>, chunk_size: usize) -> ChunkStream {
    let chunks: Vec<Result<Vec<u8>>> = data
        .chunks(chunk_size.max(1))
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    stream::iter(chunks).boxed()
}

pub(crate) fn not_found(id: &ContentId) -> Error {
    Error::StoreUnavailable(format!("content not found: {}", id))
}

/// Bytes that no longer hash to their id are corrupted evidence, not an
/// outage, so they fail with [`Error::MalformedPayload`].
pub(crate) fn verify(id: &ContentId, data: &[u8]) -> Result<()> {
    if id.matches(data) {
        Ok(())
    } else {
        Err(Error::MalformedPayload(format!(
            "content does not match its identifier: {}",
            id
        )))
    }
}

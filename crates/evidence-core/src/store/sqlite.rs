//! SQLite-backed content store.

use super::{chunked, not_found, verify, ChunkStream, ContentId, ContentStore};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::logging::RedactedHex;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const CREATE_BLOBS: &str = r#"
CREATE TABLE IF NOT EXISTS blobs (
    content_id TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    size INTEGER NOT NULL,
    pinned_at INTEGER NOT NULL
);
"#;

/// Persistent content store. Clones share one connection.
#[derive(Clone)]
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
    chunk_size: usize,
}

impl SqliteContentStore {
    /// Open or create the blob database described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = if config.in_memory {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("failed to create directory: {}", e)))?;
            }
            Connection::open(&config.path)
        }
        .map_err(|e| Error::Storage(format!("failed to open blob store: {}", e)))?;

        conn.execute_batch(CREATE_BLOBS)
            .map_err(|e| Error::Storage(format!("failed to create schema: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            chunk_size: config.chunk_size,
        })
    }

    /// Number of stored blobs.
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM blobs", [], |row| row.get(0))
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        Ok(count as u64)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StoreUnavailable("blob store lock poisoned".into()))
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentId> {
        let id = ContentId::for_content(&bytes);
        let now = chrono::Utc::now().timestamp();

        self.lock()?
            .execute(
                "INSERT OR IGNORE INTO blobs (content_id, data, size, pinned_at) \
                 VALUES (?, ?, ?, ?)",
                params![id.as_str(), bytes, bytes.len() as i64, now],
            )
            .map_err(|e| Error::StoreUnavailable(format!("failed to pin blob: {}", e)))?;

        debug!(content_id = %RedactedHex(id.as_str()), size = bytes.len(), "Pinned blob");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<ChunkStream> {
        let data: Option<Vec<u8>> = self
            .lock()?
            .query_row(
                "SELECT data FROM blobs WHERE content_id = ?",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let data = data.ok_or_else(|| not_found(id))?;
        verify(id, &data)?;
        Ok(chunked(data, self.chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::read_all;

    fn memory_config() -> StoreConfig {
        StoreConfig {
            in_memory: true,
            chunk_size: 5,
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_put_get() {
        let store = SqliteContentStore::open(&memory_config()).expect("open");
        let id = store.put(b"evs1$f$sealed".to_vec()).await.expect("put");
        assert_eq!(read_all(&store, &id).await.expect("get"), b"evs1$f$sealed");
        assert_eq!(store.count().expect("count"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_put_is_idempotent() {
        let store = SqliteContentStore::open(&memory_config()).expect("open");
        let a = store.put(b"blob".to_vec()).await.expect("put");
        let b = store.put(b"blob".to_vec()).await.expect("put");
        assert_eq!(a, b);
        assert_eq!(store.count().expect("count"), 1);
    }

    #[tokio::test]
    async fn test_missing_id() {
        let store = SqliteContentStore::open(&memory_config()).expect("open");
        let err = read_all(&store, &ContentId::new("bafkmissing")).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig {
            path: dir.path().join("nested/blobs.db").to_string_lossy().into_owned(),
            in_memory: false,
            chunk_size: 1024,
        };

        let id = {
            let store = SqliteContentStore::open(&config).expect("open");
            store.put(b"kept".to_vec()).await.expect("put")
        };

        let reopened = SqliteContentStore::open(&config).expect("reopen");
        assert_eq!(read_all(&reopened, &id).await.expect("get"), b"kept");
    }
}

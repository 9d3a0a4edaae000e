//! Persistent snippet cache.
//!
//! Encoded snippets live in the `images` table of the store, keyed by
//! `(id, z)`. The cache is write-once: a key is never overwritten, and
//! callers check [`SnippetCache::exists`] before doing any work.

use std::sync::Arc;

use bytes::Bytes;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};
use tokio::sync::Mutex;

use crate::error::StoreError;

const CREATE_IMAGES: &str = "
    CREATE TABLE IF NOT EXISTS images
    (
        id INT NOT NULL,
        z INT NOT NULL,
        image BLOB,
        PRIMARY KEY (id, z)
    )";

/// Handle to the `images` table.
#[derive(Clone)]
pub struct SnippetCache {
    conn: Arc<Mutex<Connection>>,
}

impl SnippetCache {
    /// Create the `images` table if needed. With `clear`, any existing table
    /// is dropped first.
    pub async fn open(conn: Arc<Mutex<Connection>>, clear: bool) -> Result<Self, StoreError> {
        {
            let guard = conn.lock().await;
            if clear {
                guard.execute_batch("DROP TABLE IF EXISTS images")?;
            }
            guard.execute_batch(CREATE_IMAGES)?;
        }
        Ok(Self { conn })
    }

    /// Whether a snippet is stored for `(id, zoom)`.
    pub async fn exists(&self, id: i64, zoom: u32) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM images WHERE id = ?1 AND z = ?2)",
            params![id, zoom],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Store a snippet.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyCached`] if the key is taken; the stored snippet
    /// is left untouched. Any other rejected insert is a
    /// [`StoreError::Sqlite`] and leaves no row behind.
    pub async fn put(&self, id: i64, zoom: u32, image: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        match tx.execute(
            "INSERT INTO images (id, z, image) VALUES (?1, ?2, ?3)",
            params![id, zoom, image],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                return Err(StoreError::AlreadyCached { id, zoom });
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(())
    }

    /// Stored snippet for `(id, zoom)`, if any.
    pub async fn get(&self, id: i64, zoom: u32) -> Result<Option<Bytes>, StoreError> {
        let conn = self.conn.lock().await;
        let image: Option<Option<Vec<u8>>> = conn
            .query_row(
                "SELECT image FROM images WHERE id = ?1 AND z = ?2",
                params![id, zoom],
                |row| row.get(0),
            )
            .optional()?;
        Ok(image.flatten().map(Bytes::from))
    }

    /// Number of cached snippets.
    pub async fn len(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Drop and recreate the `images` table.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute_batch("DROP TABLE IF EXISTS images")?;
        tx.execute_batch(CREATE_IMAGES)?;
        tx.commit()?;
        Ok(())
    }
}

//! SQLite-backed store shared by the pipeline.
//!
//! A single file holds:
//!
//! - `tileset_info`: one row of [`TilesetInfo`] metadata
//! - `intervals`: the [`Annotation`] rows to render
//! - `images`: the snippet cache, see [`crate::tile::SnippetCache`]
//!
//! All access goes through one connection behind an async mutex, so writes
//! are serialized.

mod annotations;
mod tileset;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::tile::SnippetCache;

pub use annotations::{load_annotations, Annotation};
pub use tileset::{TilesetInfo, GEO_HEIGHT, GEO_WIDTH};

/// How long SQLite waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to an open store file.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open an existing store.
    ///
    /// A missing file is an error rather than being silently created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        Self::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
    }

    /// Open a store, creating the file if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
    }

    /// Transient store, used in tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    fn open_with_flags(path: &Path, flags: OpenFlags) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Shared connection handle.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Read the tileset metadata row.
    pub async fn tileset_info(&self) -> Result<TilesetInfo, StoreError> {
        let conn = self.conn.lock().await;
        TilesetInfo::load(&conn)
    }

    /// Replace the tileset metadata row.
    pub async fn write_tileset_info(&self, info: &TilesetInfo) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        info.store(&mut conn)
    }

    /// Read every annotation in source order.
    pub async fn annotations(&self) -> Result<Vec<Annotation>, StoreError> {
        let conn = self.conn.lock().await;
        load_annotations(&conn)
    }

    /// Number of cached snippets, without touching the schema.
    ///
    /// A store that has never cached anything has no `images` table and
    /// reports zero.
    pub async fn cached_snippet_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let has_images: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'images')",
            [],
            |row| row.get(0),
        )?;
        if !has_images {
            return Ok(0);
        }
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Prepare the snippet cache, dropping existing snippets if `clear`.
    pub async fn snippet_cache(&self, clear: bool) -> Result<SnippetCache, StoreError> {
        SnippetCache::open(self.connection(), clear).await
    }
}

//! Test utilities for integration tests.
//!
//! Provides a mock tile source with request tracking, PNG tile builders and
//! store fixtures laid out like a real annotation database.

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use geosnip::error::FetchError;
use geosnip::io::{TileCoord, TileSource};
use geosnip::store::{Store, TilesetInfo};
use geosnip::tile::{PngEncoder, SnippetService, TileFetcher, TileRangeResolver};

// =============================================================================
// Tiles
// =============================================================================

/// Solid-color PNG tile.
pub fn png_tile(size: u32, color: [u8; 3]) -> Bytes {
    let image = RgbImage::from_pixel(size, size, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

/// Color a mock tile is painted with.
pub fn tile_color(x: i64, y: i64) -> [u8; 3] {
    [(x * 40 + 20) as u8, (y * 40 + 20) as u8, 128]
}

/// Decode a cached snippet.
pub fn decode_png(data: &[u8]) -> RgbaImage {
    image::load_from_memory_with_format(data, ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}

// =============================================================================
// Mock Tile Source
// =============================================================================

/// Serves solid tiles colored by [`tile_color`] and counts requests.
///
/// Tiles listed as missing answer with "absent".
#[derive(Clone)]
pub struct MockTileSource {
    tile_size: u32,
    missing: Arc<HashSet<(i64, i64)>>,
    all_missing: bool,
    request_count: Arc<AtomicUsize>,
}

impl MockTileSource {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            missing: Arc::new(HashSet::new()),
            all_missing: false,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_missing(mut self, tiles: &[(i64, i64)]) -> Self {
        self.missing = Arc::new(tiles.iter().copied().collect());
        self
    }

    /// Every request answers "absent".
    pub fn unavailable(mut self) -> Self {
        self.all_missing = true;
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn reset_tracking(&self) {
        self.request_count.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl TileSource for MockTileSource {
    async fn fetch_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, FetchError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        if self.all_missing || self.missing.contains(&(coord.x, coord.y)) {
            return Ok(None);
        }
        Ok(Some(png_tile(self.tile_size, tile_color(coord.x, coord.y))))
    }

    fn identifier(&self) -> &str {
        "mock"
    }
}

// =============================================================================
// Store Fixtures
// =============================================================================

/// One `intervals` row: id and box in `(start_lng, end_lng, start_lat,
/// end_lat)` order, where `start_lat` is the southern edge.
pub type AnnotationRow = (i64, f64, f64, f64, f64);

/// A store file inside a temporary directory.
pub struct StoreFixture {
    // Keeps the directory alive
    _dir: TempDir,
    pub path: PathBuf,
}

impl StoreFixture {
    /// Create a store with `tileset_info` and the given annotations.
    pub fn new(max_zoom: u32, annotations: &[AnnotationRow]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.db");

        let mut conn = Connection::open(&path).unwrap();
        TilesetInfo::geographic(max_zoom).store(&mut conn).unwrap();
        conn.execute_batch(
            "CREATE TABLE intervals
             (
                 id INT PRIMARY KEY,
                 zoomLevel INT,
                 importance REAL,
                 startLng REAL,
                 endLng REAL,
                 startLat REAL,
                 endLat REAL,
                 chrOffset INT,
                 uid TEXT,
                 geometry TEXT
             )",
        )
        .unwrap();

        // The stored startLat column holds the northern edge
        for &(id, start_lng, end_lng, south, north) in annotations {
            conn.execute(
                "INSERT INTO intervals VALUES (?1, 0, 1.0, ?2, ?3, ?4, ?5, 0, ?6, '{}')",
                params![id, start_lng, end_lng, north, south, format!("uid-{}", id)],
            )
            .unwrap();
        }

        Self { _dir: dir, path }
    }

    /// Run SQL against the store file on a separate connection.
    pub fn execute(&self, sql: &str) {
        Connection::open(&self.path)
            .unwrap()
            .execute_batch(sql)
            .unwrap();
    }

    pub fn open(&self) -> Store {
        Store::open(&self.path).unwrap()
    }

    /// Rows of the `images` table as `(id, z, image)`, ordered by key.
    pub fn images(&self) -> Vec<(i64, u32, Vec<u8>)> {
        let conn = Connection::open(&self.path).unwrap();
        let mut stmt = conn
            .prepare("SELECT id, z, image FROM images ORDER BY id, z")
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap();
        let images = rows.map(Result::unwrap).collect();
        images
    }
}

/// Service over `source` using the store's tile size and size cap.
pub async fn service_for(
    store: &Store,
    source: MockTileSource,
    padding: f64,
    clear: bool,
) -> SnippetService<MockTileSource> {
    let tileset = store.tileset_info().await.unwrap();
    SnippetService::new(
        TileFetcher::new(Arc::new(source)),
        TileRangeResolver::new(tileset.tile_size, tileset.max_size, padding),
        PngEncoder::default(),
        store.snippet_cache(clear).await.unwrap(),
    )
}

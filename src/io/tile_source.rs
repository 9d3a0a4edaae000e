use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// One remote tile: zoom level plus column and row on that level's grid.
///
/// Columns and rows are signed because padded ranges near the edge of the
/// map can reach past the grid; such tiles simply do not exist remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub zoom: u32,
    pub x: i64,
    pub y: i64,
}

impl TileCoord {
    pub fn new(zoom: u32, x: i64, y: i64) -> Self {
        Self { zoom, x, y }
    }

    /// Whether the tile lies on the `2^zoom x 2^zoom` grid.
    pub fn is_on_grid(&self) -> bool {
        let n = if self.zoom >= 63 {
            i64::MAX
        } else {
            1i64 << self.zoom
        };
        (0..n).contains(&self.x) && (0..n).contains(&self.y)
    }
}

/// Trait for retrieving encoded tile images from a remote source.
///
/// Implementations return `Ok(None)` when the source answers but has no
/// tile (404, 403, ...). Transport failures are reported as errors; callers
/// decide how to degrade.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetch the encoded bytes of one tile.
    async fn fetch_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, FetchError>;

    /// Identifier for logging, e.g. the base URL.
    fn identifier(&self) -> &str;
}

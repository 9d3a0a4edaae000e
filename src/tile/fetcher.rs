//! Concurrent tile fetching.
//!
//! Tiles of a range are requested with bounded concurrency. Results come back
//! in request order, so they can be laid out row-major without bookkeeping.
//! Any failure to produce a tile (timeout, transport error, undecodable body)
//! is logged and treated as an absent tile.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::{debug, warn};

use super::range::TileRange;
use super::stitch::TileGrid;
use crate::error::FetchError;
use crate::io::{TileCoord, TileSource};

/// Default number of tiles requested at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default time allowed for a single tile.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches and decodes the tiles of a [`TileRange`].
pub struct TileFetcher<S: TileSource> {
    source: Arc<S>,
    concurrency: usize,
    timeout: Duration,
}

impl<S: TileSource> TileFetcher<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// At least one request is always allowed.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch every tile of `range`.
    pub async fn fetch_range(&self, range: &TileRange) -> TileGrid {
        let tile_size = range.tile_size;
        let tiles: Vec<Option<RgbImage>> = stream::iter(range.coords())
            .map(|coord| self.fetch_one(coord, tile_size))
            .buffered(self.concurrency)
            .collect()
            .await;

        TileGrid::from_row_major(tiles, range.xs.len())
    }

    async fn fetch_one(&self, coord: TileCoord, tile_size: u32) -> Option<RgbImage> {
        let result = match tokio::time::timeout(self.timeout, self.source.fetch_tile(coord)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout.as_millis() as u64)),
        };

        let body = match result {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("Tile {}/{}/{} absent", coord.zoom, coord.x, coord.y);
                return None;
            }
            Err(e) => {
                warn!(
                    "Failed to fetch tile {}/{}/{} from {}: {}",
                    coord.zoom,
                    coord.x,
                    coord.y,
                    self.source.identifier(),
                    e
                );
                return None;
            }
        };

        match decode_tile(&body, tile_size) {
            Ok(tile) => Some(tile),
            Err(e) => {
                warn!("Tile {}/{}/{}: {}", coord.zoom, coord.x, coord.y, e);
                None
            }
        }
    }
}

/// Decode an encoded tile to RGB, resized to `tile_size` if necessary.
pub fn decode_tile(body: &[u8], tile_size: u32) -> Result<RgbImage, FetchError> {
    let image = image::load_from_memory(body)
        .map_err(|e| FetchError::Decode(e.to_string()))?
        .to_rgb8();

    if image.dimensions() == (tile_size, tile_size) {
        return Ok(image);
    }
    Ok(imageops::resize(&image, tile_size, tile_size, FilterType::Triangle))
}

//! # geosnip
//!
//! Pre-renders small raster previews ("snippets") of geographic annotations
//! from public map tiles and caches them as PNG inside the annotation store.
//!
//! For every annotation and zoom level the pipeline pads the bounding box,
//! works out which slippy-map tiles cover it, downloads them, stitches and
//! crops the result, and writes it to the `images` table keyed by
//! `(id, zoom)`. Snippets already cached are never fetched again.
//!
//! ## Architecture
//!
//! - [`geo`] - Web Mercator projection and bounding boxes
//! - [`io`] - Tile source abstraction and the HTTP implementation
//! - [`store`] - SQLite store: tileset metadata and annotations
//! - [`tile`] - Range resolution, fetching, stitching, PNG encoding, cache
//!   and the orchestrating service
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use geosnip::{
//!     zoom_levels, HttpTileSource, PngEncoder, SnippetService, Store, TileFetcher,
//!     TileRangeResolver, TileUrlTemplate,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open("annotations.db")?;
//!     let tileset = store.tileset_info().await?;
//!     let annotations = store.annotations().await?;
//!
//!     let source = HttpTileSource::new(
//!         TileUrlTemplate::openstreetmap(),
//!         Duration::from_secs(30),
//!     )?;
//!     let service = SnippetService::new(
//!         TileFetcher::new(Arc::new(source)),
//!         TileRangeResolver::new(tileset.tile_size, tileset.max_size, 0.1),
//!         PngEncoder::default(),
//!         store.snippet_cache(false).await?,
//!     );
//!
//!     let summary = service
//!         .run(&annotations, zoom_levels(0, None, tileset.max_zoom))
//!         .await;
//!     println!("{} snippets cached", summary.cached);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod io;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, FetchConfig, InfoConfig, InitConfig};
pub use error::{FetchError, SnippetError, StoreError};
pub use geo::{lng_lat_to_tile, GeoBounds};
pub use io::{HttpTileSource, TileCoord, TileSource, TileUrlTemplate};
pub use store::{Annotation, Store, TilesetInfo};
pub use tile::{
    encode_png, stitch_and_crop, zoom_levels, PixelLayout, PixelRect, PngEncoder, Resolution,
    RunSummary, SnippetCache, SnippetOutcome, SnippetService, TileFetcher, TileGrid, TileRange,
    TileRangeResolver,
};

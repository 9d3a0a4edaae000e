//! Snippet pipeline.
//!
//! Turns an annotation's bounding box into a cached PNG snippet built from
//! remote map tiles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             SnippetService              │
//! └────────────────────┬────────────────────┘
//!                      │ per (annotation, zoom)
//!                      ▼
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │  Resolver    │─▶│  Fetcher     │─▶│  Stitcher    │
//! │  (bbox →     │  │  (tiles via  │  │  (canvas +   │
//! │   tile range)│  │   TileSource)│  │   crop)      │
//! └──────────────┘  └──────────────┘  └──────┬───────┘
//!                                            ▼
//!                   ┌──────────────┐  ┌──────────────┐
//!                   │ SnippetCache │◀─│  PngEncoder  │
//!                   │  (images)    │  │              │
//!                   └──────────────┘  └──────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileRangeResolver`]: padding, size cap and covering tile range
//! - [`TileFetcher`]: bounded-concurrency tile downloads with timeouts
//! - [`stitch_and_crop`]: canvas assembly and cropping over a [`TileGrid`]
//! - [`PngEncoder`]: RGBA PNG encoder
//! - [`SnippetCache`]: write-once `images` table keyed by `(id, zoom)`
//! - [`SnippetService`]: orchestrates the steps and reports a [`RunSummary`]

mod cache;
mod encoder;
mod fetcher;
mod range;
mod service;
mod stitch;

pub use cache::SnippetCache;
pub use encoder::{
    encode_png, PixelLayout, PngEncoder, DEFAULT_COMPRESSION, MAX_COMPRESSION, MAX_DIMENSION,
    PNG_SIGNATURE,
};
pub use fetcher::{decode_tile, TileFetcher, DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT};
pub use range::{
    padding_fraction, PixelRect, Resolution, TileRange, TileRangeResolver, TileSpan, TileWindow,
    DEFAULT_MAX_SIZE, DEFAULT_TILE_SIZE,
};
pub use service::{zoom_levels, RunSummary, SnippetOutcome, SnippetService};
pub use stitch::{stitch_and_crop, TileGrid, ABSENT_TILE_FILL};

//! Snippet pipeline.
//!
//! [`SnippetService`] drives the whole flow for each annotation and zoom
//! level:
//!
//! 1. Skip if the snippet is already cached
//! 2. Skip if the box lies outside the geographic domain
//! 3. Resolve the covering tiles and reject oversized snippets
//! 4. Fetch, stitch and crop
//! 5. Encode as PNG and store
//!
//! A failure in one snippet is logged and the loop moves on; nothing here is
//! fatal to a run.

use std::ops::RangeInclusive;

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::cache::SnippetCache;
use super::encoder::PngEncoder;
use super::fetcher::TileFetcher;
use super::range::{Resolution, TileRange, TileRangeResolver};
use super::stitch::stitch_and_crop;
use crate::error::{SnippetError, StoreError};
use crate::io::TileSource;
use crate::store::Annotation;

/// Zoom levels to process: `from` up to `to` (or `max_zoom` when `to` is
/// unset), never beyond `max_zoom`. Empty when `from` is past the end.
pub fn zoom_levels(from: u32, to: Option<u32>, max_zoom: u32) -> RangeInclusive<u32> {
    let end = to.map_or(max_zoom, |to| to.min(max_zoom));
    from..=end
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of processing one annotation at one zoom level.
#[derive(Debug, Clone)]
pub enum SnippetOutcome {
    /// Already cached, no work done
    Skipped,

    /// Box does not intersect the geographic domain
    OutOfDomain,

    /// Snippet would exceed the size cap
    TooLarge { extent: i64, max_size: u32 },

    /// Snippet encoded and stored
    Cached {
        width: u32,
        height: u32,
        bytes: usize,
        missing_tiles: usize,
    },

    /// Snippet abandoned
    Failed(SnippetError),
}

/// Per-outcome counters for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub skipped: usize,
    pub out_of_domain: usize,
    pub too_large: usize,
    pub cached: usize,
    pub failed: usize,
    /// Absent tiles across all cached snippets
    pub missing_tiles: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &SnippetOutcome) {
        match outcome {
            SnippetOutcome::Skipped => self.skipped += 1,
            SnippetOutcome::OutOfDomain => self.out_of_domain += 1,
            SnippetOutcome::TooLarge { .. } => self.too_large += 1,
            SnippetOutcome::Cached { missing_tiles, .. } => {
                self.cached += 1;
                self.missing_tiles += missing_tiles;
            }
            SnippetOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Number of (annotation, zoom) pairs visited.
    pub fn total(&self) -> usize {
        self.skipped + self.out_of_domain + self.too_large + self.cached + self.failed
    }
}

// =============================================================================
// Service
// =============================================================================

/// Renders annotation snippets into the cache.
///
/// Generic over the [`TileSource`] so tests can substitute a fake tile
/// server.
pub struct SnippetService<S: TileSource> {
    fetcher: TileFetcher<S>,
    resolver: TileRangeResolver,
    encoder: PngEncoder,
    cache: SnippetCache,
}

impl<S: TileSource> SnippetService<S> {
    pub fn new(
        fetcher: TileFetcher<S>,
        resolver: TileRangeResolver,
        encoder: PngEncoder,
        cache: SnippetCache,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            encoder,
            cache,
        }
    }

    pub fn cache(&self) -> &SnippetCache {
        &self.cache
    }

    pub fn resolver(&self) -> &TileRangeResolver {
        &self.resolver
    }

    /// Process every annotation at every zoom in `zooms`.
    ///
    /// Annotations are visited in the given order, zoom levels ascending.
    pub async fn run(&self, annotations: &[Annotation], zooms: RangeInclusive<u32>) -> RunSummary {
        let mut summary = RunSummary::default();

        for annotation in annotations {
            for zoom in zooms.clone() {
                let outcome = self.process(annotation, zoom).await;
                summary.record(&outcome);
            }
        }

        info!(
            "Run complete: {} cached, {} skipped, {} out of domain, {} too large, {} failed",
            summary.cached,
            summary.skipped,
            summary.out_of_domain,
            summary.too_large,
            summary.failed
        );
        summary
    }

    /// Process one annotation at one zoom level.
    pub async fn process(&self, annotation: &Annotation, zoom: u32) -> SnippetOutcome {
        let id = annotation.id;

        match self.cache.exists(id, zoom).await {
            Ok(true) => {
                debug!("Skipped [{}: {}]. Already loaded", id, zoom);
                return SnippetOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => return self.failed(id, zoom, e.into()),
        }

        if !annotation.bounds.intersects_domain() {
            debug!("Skipped [{}: {}]. Outside the geographic domain", id, zoom);
            return SnippetOutcome::OutOfDomain;
        }

        let range = match self.resolver.resolve(&annotation.bounds, zoom) {
            Resolution::Ready(range) => range,
            Resolution::TooLarge { extent, max_size } => {
                warn!(
                    "Snippet [{}: {}] too big for a preview ({} > {})",
                    id, zoom, extent, max_size
                );
                return SnippetOutcome::TooLarge { extent, max_size };
            }
        };

        let (image, missing_tiles) = match self.render(&range).await {
            Ok(rendered) => rendered,
            Err(e) => return self.failed(id, zoom, e),
        };

        let png = match self.encoder.encode_rgb(&image) {
            Ok(png) => png,
            Err(e) => return self.failed(id, zoom, e),
        };

        if let Err(e) = self.cache.put(id, zoom, &png).await {
            return self.failed(id, zoom, e.into());
        }

        let pixels = range.pixels;
        let bounds = annotation.bounds;
        debug!(
            "Loaded [{}: {}] shape: {}x{} pixel pos: x:{}-{} y:{}-{} geo pos: lng:{}-{} lat:{}-{}",
            id,
            zoom,
            image.width(),
            image.height(),
            pixels.from_x,
            pixels.to_x,
            pixels.from_y,
            pixels.to_y,
            bounds.start_lng,
            bounds.end_lng,
            bounds.start_lat,
            bounds.end_lat
        );
        if missing_tiles > 0 {
            debug!(
                "Snippet [{}: {}] has {} of {} tiles missing",
                id,
                zoom,
                missing_tiles,
                range.tile_count()
            );
        }

        SnippetOutcome::Cached {
            width: image.width(),
            height: image.height(),
            bytes: png.len(),
            missing_tiles,
        }
    }

    /// Fetch and crop the snippet for `range`, returning the image and the
    /// number of absent tiles.
    pub async fn render(&self, range: &TileRange) -> Result<(RgbImage, usize), SnippetError> {
        let grid = self.fetcher.fetch_range(range).await;
        let image = stitch_and_crop(&grid, range)?;
        Ok((image, grid.missing()))
    }

    fn failed(&self, id: i64, zoom: u32, err: SnippetError) -> SnippetOutcome {
        match err {
            SnippetError::Store(StoreError::AlreadyCached { .. }) => {
                warn!("Snippet [{}: {}] was cached concurrently", id, zoom);
            }
            ref e => error!("Snippet [{}: {}] failed: {}", id, zoom, e),
        }
        SnippetOutcome::Failed(err)
    }
}

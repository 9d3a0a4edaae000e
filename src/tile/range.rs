//! Tile range resolution.
//!
//! Turns an annotation's bounding box into the set of remote tiles that must
//! be fetched and the pixel rectangle to cut out of the stitched canvas.
//!
//! # Coordinate Spaces
//!
//! - **Tile space**: fractional tile units from [`lng_lat_to_tile`]
//! - **Pixel space**: tile space scaled by the tile size, absolute over the
//!   whole zoom level
//!
//! The start corner of a [`GeoBounds`] is its south-west corner, so in tile
//! space the start row is numerically larger than the end row.

use crate::geo::{lng_lat_to_tile, GeoBounds};
use crate::io::TileCoord;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default maximum snippet edge in pixels.
pub const DEFAULT_MAX_SIZE: u32 = 512;

/// Convert a padding percentage into a fraction in `[0, 1]`.
pub fn padding_fraction(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.0;
    }
    (percent / 100.0).clamp(0.0, 1.0)
}

// =============================================================================
// Tile Window
// =============================================================================

/// A padded bounding box in fractional tile units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileWindow {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl TileWindow {
    /// Project `bounds` at `zoom` and pad it by `padding` (a fraction).
    ///
    /// The padding is derived from both axes and the smaller of the two is
    /// applied to every side, so both axes grow by the same amount.
    pub fn padded(bounds: &GeoBounds, zoom: u32, padding: f64) -> Self {
        let (west, south) = lng_lat_to_tile(bounds.start_lng, bounds.start_lat, zoom);
        let (east, north) = lng_lat_to_tile(bounds.end_lng, bounds.end_lat, zoom);

        let x_pad = padding * (east - west);
        let y_pad = padding * (south - north);
        let pad = x_pad.min(y_pad);

        Self {
            west: west - pad,
            east: east + pad,
            south: south + pad,
            north: north - pad,
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.south - self.north
    }
}

// =============================================================================
// Pixel Rectangle
// =============================================================================

/// Absolute pixel rectangle, half-open on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub from_x: i64,
    pub to_x: i64,
    pub from_y: i64,
    pub to_y: i64,
}

impl PixelRect {
    /// Smallest whole-pixel rectangle covering `window`.
    pub fn covering(window: &TileWindow, tile_size: u32) -> Self {
        let ts = tile_size as f64;
        Self {
            from_x: (window.west * ts).floor() as i64,
            to_x: (window.east * ts).ceil() as i64,
            from_y: (window.north * ts).floor() as i64,
            to_y: (window.south * ts).ceil() as i64,
        }
    }

    pub fn width(&self) -> i64 {
        self.to_x - self.from_x
    }

    pub fn height(&self) -> i64 {
        self.to_y - self.from_y
    }

    /// Larger of the two extents.
    pub fn max_extent(&self) -> i64 {
        self.width().max(self.height())
    }

    /// Widen any axis narrower than one pixel to exactly one pixel around
    /// its center. Zero and negative extents are both handled.
    pub fn with_min_extent(self) -> Self {
        let (from_x, to_x) = widen_axis(self.from_x, self.to_x);
        let (from_y, to_y) = widen_axis(self.from_y, self.to_y);
        Self {
            from_x,
            to_x,
            from_y,
            to_y,
        }
    }

    /// Shift the rectangle so `(origin_x, origin_y)` becomes `(0, 0)`.
    pub fn relative_to(&self, origin_x: i64, origin_y: i64) -> Self {
        Self {
            from_x: self.from_x - origin_x,
            to_x: self.to_x - origin_x,
            from_y: self.from_y - origin_y,
            to_y: self.to_y - origin_y,
        }
    }
}

fn widen_axis(from: i64, to: i64) -> (i64, i64) {
    if to.saturating_sub(from) >= 1 {
        return (from, to);
    }
    // Floor of the midpoint, computed wide so extreme coordinates can't overflow
    let center = (from as i128 + to as i128).div_euclid(2);
    let from = center.min(i64::MAX as i128 - 1) as i64;
    (from, from + 1)
}

// =============================================================================
// Tile Span / Tile Range
// =============================================================================

/// Inclusive run of tile indices along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpan {
    pub first: i64,
    pub last: i64,
}

impl TileSpan {
    /// Tiles between the floors of `lo` and `hi`, widened so that every
    /// pixel in `[from_px, to_px)` lies on a tile of the span.
    fn covering(lo: f64, hi: f64, from_px: i64, to_px: i64, tile_size: u32) -> Self {
        let ts = tile_size as i64;
        let first = (lo.floor() as i64).min(from_px.div_euclid(ts));
        let last = (hi.floor() as i64).max((to_px - 1).div_euclid(ts));
        Self { first, last }
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        self.first..=self.last
    }
}

/// Everything needed to fetch and crop one snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRange {
    pub zoom: u32,
    pub tile_size: u32,
    pub xs: TileSpan,
    pub ys: TileSpan,
    /// Crop rectangle in absolute pixels, at least 1x1
    pub pixels: PixelRect,
}

impl TileRange {
    pub fn tile_count(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    /// Pixel position of the top-left tile.
    pub fn origin(&self) -> (i64, i64) {
        let ts = self.tile_size as i64;
        (self.xs.first * ts, self.ys.first * ts)
    }

    /// Covering tiles in row-major order: every column of the first row,
    /// then the next row down.
    pub fn coords(&self) -> Vec<TileCoord> {
        let xs = self.xs;
        self.ys
            .iter()
            .flat_map(|y| xs.iter().map(move |x| TileCoord::new(self.zoom, x, y)))
            .collect()
    }

    /// Crop rectangle relative to the stitched canvas.
    pub fn local_pixels(&self) -> PixelRect {
        let (ox, oy) = self.origin();
        self.pixels.relative_to(ox, oy)
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Outcome of resolving a bounding box at one zoom level.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The snippet fits and can be fetched
    Ready(TileRange),

    /// The snippet would exceed the configured size cap
    TooLarge { extent: i64, max_size: u32 },
}

/// Maps bounding boxes to tile ranges for a fixed tile size, size cap and
/// padding.
#[derive(Debug, Clone, Copy)]
pub struct TileRangeResolver {
    tile_size: u32,
    max_size: u32,
    padding: f64,
}

impl TileRangeResolver {
    /// `padding` is a fraction and is clamped to `[0, 1]`.
    pub fn new(tile_size: u32, max_size: u32, padding: f64) -> Self {
        Self {
            tile_size: tile_size.max(1),
            max_size,
            padding: if padding.is_nan() {
                0.0
            } else {
                padding.clamp(0.0, 1.0)
            },
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    pub fn resolve(&self, bounds: &GeoBounds, zoom: u32) -> Resolution {
        let window = TileWindow::padded(bounds, zoom, self.padding);
        let pixels = PixelRect::covering(&window, self.tile_size);

        let extent = pixels.max_extent();
        if extent > self.max_size as i64 {
            return Resolution::TooLarge {
                extent,
                max_size: self.max_size,
            };
        }

        let pixels = pixels.with_min_extent();
        let xs = TileSpan::covering(
            window.west,
            window.east,
            pixels.from_x,
            pixels.to_x,
            self.tile_size,
        );
        let ys = TileSpan::covering(
            window.north,
            window.south,
            pixels.from_y,
            pixels.to_y,
            self.tile_size,
        );

        Resolution::Ready(TileRange {
            zoom,
            tile_size: self.tile_size,
            xs,
            ys,
            pixels,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

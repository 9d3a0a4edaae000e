//! Web Mercator projection onto the tile grid.

use std::f64::consts::PI;

/// Latitude beyond which Web Mercator diverges.
///
/// Inputs are clamped to this so polar boxes stay finite instead of
/// projecting to infinity.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Deepest zoom level the tile grid is addressed at.
///
/// Pixel coordinates at this zoom stay well inside `i64` for any tile size
/// that fits in a `u32`.
pub const MAX_ZOOM: u32 = 30;

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn tiles_per_axis(zoom: u32) -> f64 {
    2_f64.powi(zoom as i32)
}

/// Project a longitude/latitude pair to fractional tile coordinates.
///
/// The result is in tile units, not pixels: `(1.5, 0.25)` lies halfway
/// across tile column 1 and a quarter of the way down tile row 0. Columns
/// grow eastward from the antimeridian and rows grow southward from the
/// northern Mercator limit.
pub fn lng_lat_to_tile(lng: f64, lat: f64, zoom: u32) -> (f64, f64) {
    let n = tiles_per_axis(zoom);
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();

    let x = (lng + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    (x, y)
}

//! Geographic primitives.
//!
//! - [`lng_lat_to_tile`] projects WGS84 coordinates onto the slippy-map tile
//!   grid used by OpenStreetMap and Mapbox
//! - [`GeoBounds`] is an annotation's bounding box, with the domain check
//!   used to skip boxes that fall entirely off the map

mod bounds;
mod projection;

pub use bounds::{GeoBounds, LAT_EXTENT, LNG_EXTENT};
pub use projection::{lng_lat_to_tile, tiles_per_axis, MAX_MERCATOR_LAT, MAX_ZOOM};

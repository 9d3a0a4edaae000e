mod http_source;
mod tile_source;

pub use http_source::{
    HttpTileSource, TileUrlTemplate, DEFAULT_TILE_EXTENSION, MAPBOX_BASE_URL, OSM_BASE_URL,
};
pub use tile_source::{TileCoord, TileSource};

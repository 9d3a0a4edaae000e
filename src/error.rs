use thiserror::Error;

/// Errors raised by the SQLite-backed store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store file does not exist
    #[error("Store not found: {0}")]
    NotFound(String),

    /// Error reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(String),

    /// The `tileset_info` table is missing or empty
    #[error("Tileset info is missing from the store")]
    MissingTilesetInfo,

    /// A row could not be interpreted
    #[error("Invalid {table} row: {message}")]
    InvalidRow {
        table: &'static str,
        message: String,
    },

    /// A snippet is already cached for this key
    #[error("Snippet already cached for id {id} at zoom {zoom}")]
    AlreadyCached { id: i64, zoom: u32 },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err.to_string())
    }
}

/// Errors that can occur while fetching a single remote tile.
///
/// None of these abort a snippet: the fetcher turns every one of them into
/// a hole in the canvas.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network or connection error
    #[error("HTTP error: {0}")]
    Http(String),

    /// The tile did not arrive within the configured timeout
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// The response body is not a decodable raster
    #[error("Failed to decode tile: {0}")]
    Decode(String),

    /// The configured tile URL is malformed
    #[error("Invalid tile URL: {0}")]
    InvalidUrl(String),
}

/// Errors that abort processing of one snippet.
#[derive(Debug, Clone, Error)]
pub enum SnippetError {
    /// Pixel buffer has a zero dimension
    #[error("Cannot encode an empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// A dimension exceeds what a PNG header can describe
    #[error("Image dimensions {width}x{height} exceed the PNG limit of {max}")]
    InvalidDimensions { width: u32, height: u32, max: u32 },

    /// Pixel buffer length does not match the declared dimensions
    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Compression failed
    #[error("Encoding failed: {message}")]
    Encode { message: String },

    /// The tile grid does not match the resolved range
    #[error("Tile grid is {actual_x}x{actual_y}, expected {expected_x}x{expected_y}")]
    GridShape {
        expected_x: usize,
        expected_y: usize,
        actual_x: usize,
        actual_y: usize,
    },

    /// Store error while caching the result
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

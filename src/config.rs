//! Command-line configuration for geosnip.
//!
//! Every option can also be set through an environment variable with the
//! `GEOSNIP_` prefix:
//!
//! - `GEOSNIP_ZOOM_FROM` / `GEOSNIP_ZOOM_TO` - zoom range to render
//! - `GEOSNIP_MAX_SIZE` - maximum snippet edge in pixels
//! - `GEOSNIP_PADDING` - padding around each box, in percent
//! - `GEOSNIP_MAPBOX_KEY` / `GEOSNIP_MAPBOX_STYLE` - use Mapbox tiles
//! - `GEOSNIP_TILE_URL` / `GEOSNIP_TILE_EXT` - custom tile server
//! - `GEOSNIP_CONCURRENCY` - tiles fetched at once (default: 4)
//! - `GEOSNIP_TIMEOUT` - per-tile timeout in seconds (default: 30)
//! - `GEOSNIP_COMPRESSION` - PNG zlib level 0-9 (default: 9)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::error::FetchError;
use crate::geo::MAX_ZOOM;
use crate::io::{TileUrlTemplate, DEFAULT_TILE_EXTENSION};
use crate::tile::{
    padding_fraction, DEFAULT_COMPRESSION, DEFAULT_CONCURRENCY, DEFAULT_MAX_SIZE,
    DEFAULT_TILE_SIZE, MAX_COMPRESSION,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default padding around each box, in percent.
pub const DEFAULT_PADDING_PERCENT: f64 = 10.0;

/// Default per-tile timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default deepest zoom level written by `init`.
pub const DEFAULT_MAX_ZOOM: u32 = 19;

// =============================================================================
// CLI Arguments
// =============================================================================

/// geosnip - Map-tile snippets for geographic annotations.
///
/// Renders the area around every annotation of a SQLite store from remote
/// map tiles and caches the result as PNG in the same file.
#[derive(Parser, Debug, Clone)]
#[command(name = "geosnip")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch and cache snippets for every annotation
    Fetch(FetchConfig),

    /// Write tileset metadata to a store, creating it if needed
    Init(InitConfig),

    /// Print tileset metadata and cache statistics as JSON
    Info(InfoConfig),
}

// =============================================================================
// Fetch
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    /// Store file holding `tileset_info`, `intervals` and the snippet cache.
    #[arg(env = "GEOSNIP_DB")]
    pub db: PathBuf,

    /// First zoom level to render.
    #[arg(short = 'f', long, default_value_t = 0, env = "GEOSNIP_ZOOM_FROM")]
    pub zoom_from: u32,

    /// Last zoom level to render. Capped at the tileset's max zoom.
    #[arg(short = 't', long, env = "GEOSNIP_ZOOM_TO")]
    pub zoom_to: Option<u32>,

    /// Maximum snippet width or height in pixels.
    ///
    /// Defaults to the tileset's `max_size`.
    #[arg(short = 'm', long, env = "GEOSNIP_MAX_SIZE")]
    pub max_size: Option<u32>,

    /// Padding around each box, in percent of its size (clamped to 0-100).
    #[arg(short = 'p', long, default_value_t = DEFAULT_PADDING_PERCENT, env = "GEOSNIP_PADDING")]
    pub padding: f64,

    /// Drop all cached snippets before fetching.
    #[arg(short = 'c', long, default_value_t = false)]
    pub clear: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    // =========================================================================
    // Tile Source
    // =========================================================================
    /// Mapbox access token. Tiles come from OpenStreetMap when unset.
    #[arg(long = "mapbox", env = "GEOSNIP_MAPBOX_KEY")]
    pub mapbox_key: Option<String>,

    /// Mapbox tileset, e.g. `mapbox.satellite`.
    #[arg(long, env = "GEOSNIP_MAPBOX_STYLE")]
    pub mapbox_style: Option<String>,

    /// Custom tile server base URL, used as `{url}/{z}/{x}/{y}.{ext}`.
    ///
    /// Overrides the built-in providers. The Mapbox token, if any, is still
    /// sent as `access_token`.
    #[arg(long, env = "GEOSNIP_TILE_URL")]
    pub tile_url: Option<String>,

    /// Tile file extension for a custom tile server.
    #[arg(long, default_value = DEFAULT_TILE_EXTENSION, env = "GEOSNIP_TILE_EXT")]
    pub tile_ext: String,

    /// Number of tiles fetched at once.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "GEOSNIP_CONCURRENCY")]
    pub concurrency: usize,

    /// Per-tile timeout in seconds. A late tile is treated as missing.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "GEOSNIP_TIMEOUT")]
    pub timeout: u64,

    /// PNG zlib compression level (0-9).
    #[arg(long, default_value_t = DEFAULT_COMPRESSION, env = "GEOSNIP_COMPRESSION")]
    pub compression: u32,
}

impl FetchConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.padding.is_finite() {
            return Err("padding must be a finite percentage".to_string());
        }

        if let Some(zoom_to) = self.zoom_to {
            if zoom_to < self.zoom_from {
                return Err(format!(
                    "zoom_to ({}) must not be below zoom_from ({})",
                    zoom_to, self.zoom_from
                ));
            }
        }

        if self.max_size == Some(0) {
            return Err("max_size must be greater than 0".to_string());
        }

        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }

        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.compression > MAX_COMPRESSION {
            return Err(format!(
                "compression must be between 0 and {}",
                MAX_COMPRESSION
            ));
        }

        if self.mapbox_style.is_some() && self.mapbox_key().is_none() && self.tile_url.is_none() {
            return Err(
                "A Mapbox style needs an access token. Set --mapbox or GEOSNIP_MAPBOX_KEY"
                    .to_string(),
            );
        }

        if self.tile_ext.trim_start_matches('.').is_empty() {
            return Err("tile_ext must not be empty".to_string());
        }

        Ok(())
    }

    /// Non-empty Mapbox token.
    pub fn mapbox_key(&self) -> Option<&str> {
        self.mapbox_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Padding as a fraction in `[0, 1]`.
    pub fn padding_fraction(&self) -> f64 {
        padding_fraction(self.padding)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Effective size cap given the tileset's own.
    pub fn effective_max_size(&self, tileset_max_size: Option<u32>) -> u32 {
        self.max_size
            .or(tileset_max_size.filter(|&s| s > 0))
            .unwrap_or(DEFAULT_MAX_SIZE)
    }

    /// Where to fetch tiles from: a custom URL, Mapbox, or OpenStreetMap.
    pub fn tile_template(&self) -> Result<TileUrlTemplate, FetchError> {
        let token = self.mapbox_key().map(str::to_string);

        if let Some(ref url) = self.tile_url {
            return TileUrlTemplate::new(url, &self.tile_ext, token);
        }

        Ok(match token {
            Some(token) => TileUrlTemplate::mapbox(self.mapbox_style.as_deref(), token),
            None => TileUrlTemplate::openstreetmap(),
        })
    }
}

// =============================================================================
// Init / Info
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InitConfig {
    /// Store file to initialise.
    #[arg(env = "GEOSNIP_DB")]
    pub db: PathBuf,

    /// Deepest zoom level snippets are rendered at.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM, env = "GEOSNIP_MAX_ZOOM")]
    pub max_zoom: u32,

    /// Tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "GEOSNIP_TILE_SIZE")]
    pub tile_size: u32,

    /// Maximum snippet width or height in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE, env = "GEOSNIP_MAX_SIZE")]
    pub max_size: u32,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.max_size == 0 {
            return Err("max_size must be greater than 0".to_string());
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(format!("max_zoom must be at most {}", MAX_ZOOM));
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Store file to inspect.
    #[arg(env = "GEOSNIP_DB")]
    pub db: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================

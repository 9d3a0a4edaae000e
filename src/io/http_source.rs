//! HTTP-backed tile source.
//!
//! Tiles are requested as `{base_url}/{z}/{x}/{y}.{ext}`, optionally with an
//! `access_token` query parameter. OpenStreetMap and Mapbox differ only in
//! the base URL and whether a token is sent.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{TileCoord, TileSource};
use crate::error::FetchError;

/// OpenStreetMap standard tile layer.
pub const OSM_BASE_URL: &str = "https://tile.openstreetmap.org";

/// Mapbox raster tiles API (v4).
pub const MAPBOX_BASE_URL: &str = "https://api.tiles.mapbox.com/v4";

/// Default tile file extension.
pub const DEFAULT_TILE_EXTENSION: &str = "png";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// URL Template
// =============================================================================

/// Where tiles live and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    base_url: String,
    extension: String,
    access_token: Option<String>,
}

impl TileUrlTemplate {
    /// Create a template from a base URL.
    ///
    /// Trailing slashes are dropped. An empty token counts as no token.
    pub fn new(
        base_url: &str,
        extension: &str,
        access_token: Option<String>,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.trim_end_matches('/');
        let parsed = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            extension: extension.trim_start_matches('.').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    /// Public OpenStreetMap tiles.
    pub fn openstreetmap() -> Self {
        Self {
            base_url: OSM_BASE_URL.to_string(),
            extension: DEFAULT_TILE_EXTENSION.to_string(),
            access_token: None,
        }
    }

    /// Mapbox tiles for `style` (a tileset id such as `mapbox.satellite`).
    pub fn mapbox(style: Option<&str>, access_token: impl Into<String>) -> Self {
        let base_url = match style.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
            Some(style) => format!("{}/{}", MAPBOX_BASE_URL, style),
            None => MAPBOX_BASE_URL.to_string(),
        };
        let access_token = access_token.into();

        Self {
            base_url,
            extension: DEFAULT_TILE_EXTENSION.to_string(),
            access_token: Some(access_token).filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Full URL of one tile.
    pub fn tile_url(&self, coord: TileCoord) -> String {
        let mut url = format!(
            "{}/{}/{}/{}.{}",
            self.base_url, coord.zoom, coord.x, coord.y, self.extension
        );
        if let Some(ref token) = self.access_token {
            url.push_str("?access_token=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }
}

// =============================================================================
// HTTP Source
// =============================================================================

/// [`TileSource`] that downloads tiles over HTTP(S).
#[derive(Clone)]
pub struct HttpTileSource {
    client: Client,
    template: TileUrlTemplate,
    timeout: Duration,
}

impl HttpTileSource {
    /// Build a source with a per-request timeout.
    pub fn new(template: TileUrlTemplate, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self {
            client,
            template,
            timeout,
        })
    }

    pub fn template(&self) -> &TileUrlTemplate {
        &self.template
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, FetchError> {
        if !coord.is_on_grid() {
            return Ok(None);
        }

        let url = self.template.tile_url(coord);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout.as_millis() as u64)
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(
                "Tile {}/{}/{} unavailable: HTTP {}",
                coord.zoom, coord.x, coord.y, status
            );
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Some(body))
    }

    fn identifier(&self) -> &str {
        self.template.base_url()
    }
}

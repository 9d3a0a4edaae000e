use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::StoreError;
use crate::geo::MAX_ZOOM;
use crate::tile::{DEFAULT_MAX_SIZE, DEFAULT_TILE_SIZE};

/// Logical width of a geographic tileset (degrees of longitude).
pub const GEO_WIDTH: u64 = 360;

/// Logical height of a geographic tileset (degrees of latitude).
pub const GEO_HEIGHT: u64 = 180;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS tileset_info
    (
        zoom_step INT,
        max_length INT,
        assembly TEXT,
        chrom_names TEXT,
        chrom_sizes TEXT,
        tile_size INT,
        max_zoom INT,
        max_size INT,
        width INT,
        height INT
    )";

const SELECT_ROW: &str = "
    SELECT zoom_step, max_length, assembly, chrom_names, chrom_sizes,
           tile_size, max_zoom, max_size, width, height
    FROM tileset_info
    LIMIT 1";

/// Metadata describing the projection domain of a tileset.
///
/// `chrom_names` and `chrom_sizes` are parallel and stored tab-separated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesetInfo {
    pub zoom_step: u32,
    pub max_length: u64,
    pub assembly: String,
    pub chrom_names: Vec<String>,
    pub chrom_sizes: Vec<u64>,
    pub tile_size: u32,
    pub max_zoom: u32,
    pub max_size: u32,
    pub width: u64,
    pub height: u64,
}

impl TilesetInfo {
    /// Metadata for a whole-world geographic tileset.
    pub fn geographic(max_zoom: u32) -> Self {
        Self {
            zoom_step: 1,
            max_length: GEO_WIDTH.max(GEO_HEIGHT),
            assembly: String::new(),
            chrom_names: Vec::new(),
            chrom_sizes: Vec::new(),
            tile_size: DEFAULT_TILE_SIZE,
            max_zoom,
            max_size: DEFAULT_MAX_SIZE,
            width: GEO_WIDTH,
            height: GEO_HEIGHT,
        }
    }

    /// Read the single metadata row.
    pub fn load(conn: &Connection) -> Result<Self, StoreError> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'tileset_info')",
            [],
            |row| row.get(0),
        )?;
        if !table_exists {
            return Err(StoreError::MissingTilesetInfo);
        }

        let raw = conn
            .query_row(SELECT_ROW, [], RawTilesetRow::from_row)
            .optional()?
            .ok_or(StoreError::MissingTilesetInfo)?;

        raw.try_into()
    }

    /// Replace the metadata row, creating the table if needed.
    pub fn store(&self, conn: &mut Connection) -> Result<(), StoreError> {
        if self.chrom_names.len() != self.chrom_sizes.len() {
            return Err(invalid(format!(
                "{} chromosome names but {} sizes",
                self.chrom_names.len(),
                self.chrom_sizes.len()
            )));
        }

        let chrom_sizes: Vec<String> = self.chrom_sizes.iter().map(u64::to_string).collect();

        let tx = conn.transaction()?;
        tx.execute_batch(CREATE_TABLE)?;
        tx.execute("DELETE FROM tileset_info", [])?;
        tx.execute(
            "INSERT INTO tileset_info VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                self.zoom_step,
                self.max_length as i64,
                self.assembly,
                self.chrom_names.join("\t"),
                chrom_sizes.join("\t"),
                self.tile_size,
                self.max_zoom,
                self.max_size,
                self.width as i64,
                self.height as i64,
            ],
        )?;
        tx.commit()?;

        Ok(())
    }
}

fn invalid(message: String) -> StoreError {
    StoreError::InvalidRow {
        table: "tileset_info",
        message,
    }
}

/// Row as stored, before range checks.
struct RawTilesetRow {
    zoom_step: Option<i64>,
    max_length: Option<i64>,
    assembly: Option<String>,
    chrom_names: Option<String>,
    chrom_sizes: Option<String>,
    tile_size: Option<i64>,
    max_zoom: Option<i64>,
    max_size: Option<i64>,
    width: Option<i64>,
    height: Option<i64>,
}

impl RawTilesetRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            zoom_step: row.get(0)?,
            max_length: row.get(1)?,
            assembly: row.get(2)?,
            chrom_names: row.get(3)?,
            chrom_sizes: row.get(4)?,
            tile_size: row.get(5)?,
            max_zoom: row.get(6)?,
            max_size: row.get(7)?,
            width: row.get(8)?,
            height: row.get(9)?,
        })
    }
}

impl TryFrom<RawTilesetRow> for TilesetInfo {
    type Error = StoreError;

    fn try_from(raw: RawTilesetRow) -> Result<Self, Self::Error> {
        let tile_size = to_u32("tile_size", raw.tile_size.unwrap_or(DEFAULT_TILE_SIZE as i64))?;
        if tile_size == 0 {
            return Err(invalid("tile_size must be positive".to_string()));
        }

        let max_zoom = raw
            .max_zoom
            .ok_or_else(|| invalid("max_zoom is NULL".to_string()))
            .and_then(|v| to_u32("max_zoom", v))?;
        if max_zoom > MAX_ZOOM {
            return Err(invalid(format!(
                "max_zoom {} exceeds the deepest supported zoom {}",
                max_zoom, MAX_ZOOM
            )));
        }

        let width = to_u64("width", raw.width.unwrap_or(GEO_WIDTH as i64))?;
        let height = to_u64("height", raw.height.unwrap_or(GEO_HEIGHT as i64))?;

        let chrom_names = split_tabs(raw.chrom_names.as_deref());
        let chrom_sizes = split_tabs(raw.chrom_sizes.as_deref())
            .iter()
            .map(|s| {
                s.parse::<u64>()
                    .map_err(|_| invalid(format!("chrom size '{}' is not a number", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            zoom_step: to_u32("zoom_step", raw.zoom_step.unwrap_or(1))?,
            max_length: to_u64("max_length", raw.max_length.unwrap_or(width.max(height) as i64))?,
            assembly: raw.assembly.unwrap_or_default(),
            chrom_names,
            chrom_sizes,
            tile_size,
            max_zoom,
            max_size: to_u32("max_size", raw.max_size.unwrap_or(DEFAULT_MAX_SIZE as i64))?,
            width,
            height,
        })
    }
}

fn split_tabs(value: Option<&str>) -> Vec<String> {
    match value {
        Some(s) if !s.is_empty() => s.split('\t').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn to_u32(column: &str, value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| invalid(format!("{} out of range: {}", column, value)))
}

fn to_u64(column: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| invalid(format!("{} out of range: {}", column, value)))
}

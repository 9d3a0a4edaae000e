//! Tile stitching and cropping.
//!
//! Fetched tiles are laid out on a canvas of `xs.len() * tile_size` by
//! `ys.len() * tile_size` pixels, with the top-left tile at the canvas
//! origin. The snippet is then cut from the canvas using the range's pixel
//! rectangle translated into canvas coordinates.

use image::{imageops, Rgb, RgbImage};

use super::range::{PixelRect, TileRange};
use crate::error::SnippetError;

/// Color used where a tile could not be fetched.
pub const ABSENT_TILE_FILL: Rgb<u8> = Rgb([0, 0, 0]);

/// Decoded tiles of one range, indexed `[row][column]`.
///
/// `None` marks a tile that is absent.
#[derive(Debug, Clone, Default)]
pub struct TileGrid {
    rows: Vec<Vec<Option<RgbImage>>>,
}

impl TileGrid {
    pub fn new(rows: Vec<Vec<Option<RgbImage>>>) -> Self {
        Self { rows }
    }

    /// Build a grid from tiles in row-major order, `columns` per row.
    pub fn from_row_major(tiles: Vec<Option<RgbImage>>, columns: usize) -> Self {
        if columns == 0 {
            return Self::default();
        }

        let mut rows = Vec::with_capacity(tiles.len() / columns + 1);
        let mut iter = tiles.into_iter().peekable();
        while iter.peek().is_some() {
            rows.push(iter.by_ref().take(columns).collect());
        }
        Self { rows }
    }

    /// `(columns, rows)`, taking the column count from the first row.
    pub fn dimensions(&self) -> (usize, usize) {
        let columns = self.rows.first().map_or(0, Vec::len);
        (columns, self.rows.len())
    }

    pub fn get(&self, column: usize, row: usize) -> Option<&RgbImage> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// Number of absent tiles.
    pub fn missing(&self) -> usize {
        self.rows.iter().flatten().filter(|t| t.is_none()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.missing() == 0
    }

    fn has_shape(&self, columns: usize, rows: usize) -> bool {
        self.rows.len() == rows && self.rows.iter().all(|r| r.len() == columns)
    }
}

/// Stitch `grid` and crop it to the range's pixel rectangle.
///
/// Absent tiles leave their area filled with [`ABSENT_TILE_FILL`]. The
/// result is always at least 1x1.
pub fn stitch_and_crop(grid: &TileGrid, range: &TileRange) -> Result<RgbImage, SnippetError> {
    let columns = range.xs.len();
    let rows = range.ys.len();
    if !grid.has_shape(columns, rows) {
        let (actual_x, actual_y) = grid.dimensions();
        return Err(SnippetError::GridShape {
            expected_x: columns,
            expected_y: rows,
            actual_x,
            actual_y,
        });
    }

    let ts = range.tile_size;
    let local = range.local_pixels();

    // One tile: crop it directly
    if columns == 1 && rows == 1 {
        return Ok(match grid.get(0, 0) {
            Some(tile) => crop(tile, local),
            None => blank(local),
        });
    }

    let mut canvas = RgbImage::from_pixel(columns as u32 * ts, rows as u32 * ts, ABSENT_TILE_FILL);
    for row in 0..rows {
        for column in 0..columns {
            if let Some(tile) = grid.get(column, row) {
                imageops::replace(
                    &mut canvas,
                    tile,
                    column as i64 * ts as i64,
                    row as i64 * ts as i64,
                );
            }
        }
    }

    Ok(crop(&canvas, local))
}

/// Cut `rect` out of `image`, clamped to the image bounds and at least 1x1.
fn crop(image: &RgbImage, rect: PixelRect) -> RgbImage {
    let (width, height) = image.dimensions();
    let from_x = rect.from_x.clamp(0, width.saturating_sub(1) as i64);
    let from_y = rect.from_y.clamp(0, height.saturating_sub(1) as i64);
    let to_x = rect.to_x.clamp(from_x + 1, width.max(1) as i64);
    let to_y = rect.to_y.clamp(from_y + 1, height.max(1) as i64);

    if width == 0 || height == 0 {
        return blank(rect);
    }

    imageops::crop_imm(
        image,
        from_x as u32,
        from_y as u32,
        (to_x - from_x) as u32,
        (to_y - from_y) as u32,
    )
    .to_image()
}

fn blank(rect: PixelRect) -> RgbImage {
    RgbImage::from_pixel(
        rect.width().max(1) as u32,
        rect.height().max(1) as u32,
        ABSENT_TILE_FILL,
    )
}

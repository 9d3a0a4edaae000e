//! Minimal PNG encoder for snippets.
//!
//! Produces the smallest valid PNG that can carry an 8-bit RGBA raster:
//!
//! ```text
//! 89 50 4E 47 0D 0A 1A 0A                 signature
//! [len][IHDR][w h 8 6 0 0 0][crc]         header
//! [len][IDAT][zlib(rows)][crc]            pixel data
//! [len][IEND][][crc]                      end marker
//! ```
//!
//! Each row in `IDAT` is prefixed with filter type 0 (none). Rows are written
//! top row first, which is PNG's native order, so the decoded image has the
//! same orientation as the input buffer. RGB input is widened to RGBA with an
//! opaque alpha channel.

use std::io::Write;

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};
use image::RgbImage;

use crate::error::SnippetError;

/// The eight-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Default zlib compression level.
pub const DEFAULT_COMPRESSION: u32 = 9;

/// Highest zlib compression level.
pub const MAX_COMPRESSION: u32 = 9;

/// Largest width or height a PNG header can carry.
pub const MAX_DIMENSION: u32 = i32::MAX as u32;

const BIT_DEPTH: u8 = 8;
const COLOR_TYPE_RGBA: u8 = 6;
const FILTER_NONE: u8 = 0;
const RGBA_CHANNELS: usize = 4;

/// Channel layout of an input pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// PNG encoder with a fixed compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngEncoder {
    compression: u32,
}

impl PngEncoder {
    /// Levels above 9 are clamped.
    pub fn new(compression: u32) -> Self {
        Self {
            compression: compression.min(MAX_COMPRESSION),
        }
    }

    pub fn compression(&self) -> u32 {
        self.compression
    }

    /// Encode a raw, row-major pixel buffer.
    pub fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Bytes, SnippetError> {
        encode_png(pixels, width, height, layout, self.compression)
    }

    /// Encode an RGB image.
    pub fn encode_rgb(&self, image: &RgbImage) -> Result<Bytes, SnippetError> {
        self.encode(
            image.as_raw(),
            image.width(),
            image.height(),
            PixelLayout::Rgb,
        )
    }
}

impl Default for PngEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION)
    }
}

/// Encode `pixels` as an RGBA PNG.
///
/// `pixels` is row-major, top row first, with `layout.channels()` bytes per
/// pixel.
///
/// # Errors
///
/// - [`SnippetError::EmptyImage`] if either dimension is zero
/// - [`SnippetError::InvalidDimensions`] if either dimension exceeds
///   [`MAX_DIMENSION`]
/// - [`SnippetError::BufferSizeMismatch`] if the buffer length disagrees
///   with the dimensions
/// - [`SnippetError::Encode`] if compression fails
pub fn encode_png(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    compression: u32,
) -> Result<Bytes, SnippetError> {
    if width == 0 || height == 0 {
        return Err(SnippetError::EmptyImage { width, height });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(SnippetError::InvalidDimensions {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(layout.channels()))
        .ok_or(SnippetError::BufferSizeMismatch {
            expected: usize::MAX,
            actual: pixels.len(),
        })?;
    if pixels.len() != expected {
        return Err(SnippetError::BufferSizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }

    let raw = filtered_scanlines(pixels, width as usize, layout);
    let idat = deflate(&raw, compression)?;

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[BIT_DEPTH, COLOR_TYPE_RGBA, 0, 0, 0]);

    let mut out = Vec::with_capacity(PNG_SIGNATURE.len() + 3 * 12 + ihdr.len() + idat.len());
    out.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut out, b"IHDR", &ihdr);
    write_chunk(&mut out, b"IDAT", &idat);
    write_chunk(&mut out, b"IEND", &[]);

    Ok(Bytes::from(out))
}

/// RGBA rows, each prefixed with the filter byte.
fn filtered_scanlines(pixels: &[u8], width: usize, layout: PixelLayout) -> Vec<u8> {
    let src_stride = width * layout.channels();
    let dst_stride = width * RGBA_CHANNELS;
    let rows = pixels.len() / src_stride;

    let mut raw = Vec::with_capacity(rows * (dst_stride + 1));
    for row in pixels.chunks_exact(src_stride) {
        raw.push(FILTER_NONE);
        match layout {
            PixelLayout::Rgba => raw.extend_from_slice(row),
            PixelLayout::Rgb => {
                for px in row.chunks_exact(3) {
                    raw.extend_from_slice(px);
                    raw.push(u8::MAX);
                }
            }
        }
    }
    raw
}

fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>, SnippetError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(MAX_COMPRESSION)));
    encoder.write_all(data).map_err(|e| SnippetError::Encode {
        message: e.to_string(),
    })?;
    encoder.finish().map_err(|e| SnippetError::Encode {
        message: e.to_string(),
    })
}

/// Append `[len][tag][payload][crc32(tag + payload)]`.
fn write_chunk(out: &mut Vec<u8>, tag: &[u8; 4], payload: &[u8]) {
    let mut crc = Crc::new();
    crc.update(tag);
    crc.update(payload);

    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}

// =============================================================================
// Tests
// =============================================================================

//! Tile decoding.
//!
//! Turns a raw tile stream from the container into RGBA8 pixels at the
//! level's nominal tile size. JPEG tiles may be abbreviated streams that
//! rely on shared tables stored once per directory; those are merged in
//! before decoding. JPEG 2000 codestreams come in two flavors that differ
//! only in how the three components are to be interpreted, so the YCbCr
//! variant gets a color conversion after decoding.
//!
//! Errors are reported as plain reason strings; callers attach the tile
//! coordinates they were working on.

use std::io::Cursor;

use image::{DynamicImage, ImageReader};

use crate::format::jpeg;
use crate::format::tiff::Compression;
use crate::tile::cache::TileBuffer;

// =============================================================================
// Decoding
// =============================================================================

/// Decode one tile stream into an RGBA8 buffer of exactly
/// `width * height` pixels.
pub(crate) fn decode_tile(
    compression: Compression,
    data: &[u8],
    jpeg_tables: Option<&[u8]>,
    width: u32,
    height: u32,
) -> Result<TileBuffer, String> {
    match compression {
        Compression::Jpeg => decode_jpeg(data, jpeg_tables, width, height),
        Compression::Jpeg2000Ycbcr => decode_jp2k(data, width, height, true),
        Compression::Jpeg2000Rgb => decode_jp2k(data, width, height, false),
        other => Err(format!(
            "no decoder for compression {} ({})",
            other.name(),
            other.code()
        )),
    }
}

fn decode_jpeg(
    data: &[u8],
    jpeg_tables: Option<&[u8]>,
    width: u32,
    height: u32,
) -> Result<TileBuffer, String> {
    let stream = jpeg::prepare_tile(jpeg_tables, data);

    let reader = ImageReader::with_format(Cursor::new(stream.as_ref()), image::ImageFormat::Jpeg);
    let decoded = reader
        .decode()
        .map_err(|e| format!("JPEG decode failed: {e}"))?;

    into_tile_buffer(decoded, width, height, false)
}

fn decode_jp2k(data: &[u8], width: u32, height: u32, is_ycbcr: bool) -> Result<TileBuffer, String> {
    let codestream =
        jpeg2k::Image::from_bytes(data).map_err(|e| format!("JPEG 2000 decode failed: {e}"))?;
    let decoded = DynamicImage::try_from(&codestream)
        .map_err(|e| format!("JPEG 2000 component layout not supported: {e}"))?;

    // Single-component codestreams are plain grayscale either way
    let convert = is_ycbcr && decoded.color().channel_count() >= 3;
    into_tile_buffer(decoded, width, height, convert)
}

fn into_tile_buffer(
    decoded: DynamicImage,
    width: u32,
    height: u32,
    convert_sycc: bool,
) -> Result<TileBuffer, String> {
    if decoded.width() != width || decoded.height() != height {
        return Err(format!(
            "expected {}x{} pixels, got {}x{}",
            width,
            height,
            decoded.width(),
            decoded.height()
        ));
    }

    let mut pixels = decoded.to_rgba8().into_raw();
    if convert_sycc {
        sycc_to_rgb_in_place(&mut pixels);
    }
    Ok(TileBuffer::new(width, height, pixels))
}

/// In-place sYCC to RGB conversion (ITU-R BT.601, full range). Alpha is
/// left untouched.
fn sycc_to_rgb_in_place(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let y = px[0] as f32;
        let cb = px[1] as f32 - 128.0;
        let cr = px[2] as f32 - 128.0;
        px[0] = (y + 1.402 * cr).round().clamp(0.0, 255.0) as u8;
        px[1] = (y - 0.344_136 * cb - 0.714_136 * cr)
            .round()
            .clamp(0.0, 255.0) as u8;
        px[2] = (y + 1.772 * cb).round().clamp(0.0, 255.0) as u8;
    }
}

// =============================================================================
// Edge Clipping
// =============================================================================

/// Zero out the pixels of an edge tile that lie past the level's image
/// bounds. Tiles are stored at the full nominal size even on the right and
/// bottom edges, and the padding content is undefined.
pub(crate) fn clip_tile(tile: &mut TileBuffer, valid_width: u32, valid_height: u32) {
    let tile_w = tile.width() as usize;
    let tile_h = tile.height() as usize;
    let valid_w = (valid_width as usize).min(tile_w);
    let valid_h = (valid_height as usize).min(tile_h);
    if valid_w == tile_w && valid_h == tile_h {
        return;
    }

    let pixels = tile.pixels_mut();
    for y in 0..tile_h {
        let row = y * tile_w * 4;
        if y >= valid_h {
            pixels[row..row + tile_w * 4].fill(0);
        } else if valid_w < tile_w {
            pixels[row + valid_w * 4..row + tile_w * 4].fill(0);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

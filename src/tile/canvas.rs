//! Destination buffer for region reads.
//!
//! A `Canvas` is a zero-initialized RGBA8 surface spanning the requested
//! region. Tiles are blitted into it at offsets computed by the grid;
//! offsets may be negative or reach past the canvas edges, in which case
//! the copy is clipped. Pixels never covered by a tile stay transparent.

use image::RgbaImage;

use crate::tile::cache::TileBuffer;

const BYTES_PER_PIXEL: usize = 4;

// =============================================================================
// Canvas
// =============================================================================

/// RGBA8 pixel surface for compositing tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Allocate a transparent canvas of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 pixel data, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the canvas and return the raw RGBA8 pixel vector.
    pub fn into_vec(self) -> Vec<u8> {
        self.pixels
    }

    /// Convert into an [`image::RgbaImage`] for encoding or resizing.
    pub fn into_rgba_image(self) -> RgbaImage {
        // pixel length is width * height * 4 by construction
        RgbaImage::from_raw(self.width, self.height, self.pixels).unwrap()
    }

    /// Copy a tile onto the canvas with its top-left corner at
    /// `(dst_x, dst_y)`, clipping to the canvas bounds.
    ///
    /// Tiles in a grid never overlap, so the copy replaces destination
    /// pixels outright.
    pub(crate) fn blit(&mut self, tile: &TileBuffer, dst_x: i64, dst_y: i64) {
        let tile_w = tile.width() as i64;
        let tile_h = tile.height() as i64;
        let canvas_w = self.width as i64;
        let canvas_h = self.height as i64;

        // Intersection of the tile rectangle with the canvas
        let x0 = dst_x.max(0);
        let y0 = dst_y.max(0);
        let x1 = (dst_x + tile_w).min(canvas_w);
        let y1 = (dst_y + tile_h).min(canvas_h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let row_bytes = (x1 - x0) as usize * BYTES_PER_PIXEL;
        let src_pixels = tile.pixels();
        for y in y0..y1 {
            let src_row = (y - dst_y) as usize;
            let src_col = (x0 - dst_x) as usize;
            let src_off = (src_row * tile_w as usize + src_col) * BYTES_PER_PIXEL;
            let dst_off = (y as usize * self.width as usize + x0 as usize) * BYTES_PER_PIXEL;
            self.pixels[dst_off..dst_off + row_bytes]
                .copy_from_slice(&src_pixels[src_off..src_off + row_bytes]);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

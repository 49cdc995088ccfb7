//! Tile grid geometry and region painting.
//!
//! Each pyramid level is a uniform grid of fixed-size tiles. Painting a
//! region means working out which tiles the region rectangle touches,
//! asking a [`TilePainter`] for each one, and letting the painter blit
//! into the destination canvas at the offset the grid computed. Tiles
//! outside the grid are skipped, so regions hanging past the level edges
//! come back partially transparent rather than failing.
//!
//! The region origin is in level pixel coordinates and may be fractional:
//! callers map slide coordinates down by the level downsample before
//! painting, and that division rarely lands on an integer.

use async_trait::async_trait;

use crate::error::TileError;
use crate::tile::canvas::Canvas;

// =============================================================================
// Tile Painter
// =============================================================================

/// Source of pixels for one level's tiles.
///
/// Implementations decode (or fetch from cache) the tile at `(col, row)`
/// and blit it onto `canvas` with its top-left corner at `(dst_x, dst_y)`.
#[async_trait]
pub(crate) trait TilePainter: Send + Sync {
    async fn paint_tile(
        &self,
        col: u32,
        row: u32,
        canvas: &mut Canvas,
        dst_x: i64,
        dst_y: i64,
    ) -> Result<(), TileError>;
}

// =============================================================================
// Tile Grid
// =============================================================================

/// Fixed-size tile grid covering one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileGrid {
    tiles_across: u32,
    tiles_down: u32,
    tile_width: u32,
    tile_height: u32,
}

impl TileGrid {
    pub(crate) fn new(tiles_across: u32, tiles_down: u32, tile_width: u32, tile_height: u32) -> Self {
        debug_assert!(tile_width > 0 && tile_height > 0);
        Self {
            tiles_across,
            tiles_down,
            tile_width,
            tile_height,
        }
    }

    pub(crate) fn tiles_across(&self) -> u32 {
        self.tiles_across
    }

    pub(crate) fn tiles_down(&self) -> u32 {
        self.tiles_down
    }

    pub(crate) fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub(crate) fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Paint every grid tile the region touches onto `canvas`.
    ///
    /// `origin_x`/`origin_y` position the canvas's top-left corner in
    /// level pixel coordinates. Fractional origins are honored by rounding
    /// each tile's destination offset individually.
    pub(crate) async fn paint_region(
        &self,
        painter: &dyn TilePainter,
        canvas: &mut Canvas,
        origin_x: f64,
        origin_y: f64,
    ) -> Result<(), TileError> {
        if canvas.width() == 0 || canvas.height() == 0 {
            return Ok(());
        }

        let tile_w = self.tile_width as f64;
        let tile_h = self.tile_height as f64;

        // Tile index ranges touched by the region, clipped to the grid
        let first_col = (origin_x / tile_w).floor() as i64;
        let last_col = ((origin_x + canvas.width() as f64) / tile_w).ceil() as i64;
        let first_row = (origin_y / tile_h).floor() as i64;
        let last_row = ((origin_y + canvas.height() as f64) / tile_h).ceil() as i64;

        let col_range = first_col.max(0)..last_col.min(self.tiles_across as i64);
        let row_range = first_row.max(0)..last_row.min(self.tiles_down as i64);

        for row in row_range {
            for col in col_range.clone() {
                let dst_x = (col as f64 * tile_w - origin_x).round() as i64;
                let dst_y = (row as f64 * tile_h - origin_y).round() as i64;
                painter
                    .paint_tile(col as u32, row as u32, canvas, dst_x, dst_y)
                    .await?;
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

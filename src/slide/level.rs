//! Pyramid level geometry and tile placement.
//!
//! A level is one tiled directory of the container promoted into the
//! pyramid. The tile offset and byte count tables are pulled out of the
//! directory once at build time, so painting a tile later is a single
//! range read plus a decode. Level 0 is the highest resolution; the
//! downsample factor is always relative to level 0's width.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{OpenError, TiffError};
use crate::format::tiff::{Compression, TiffDump, TiffTag};
use crate::tile::TileGrid;

// =============================================================================
// Level
// =============================================================================

/// One pyramid level backed by a tiled container directory.
#[derive(Debug, Clone)]
pub(crate) struct Level {
    /// Index of the backing directory in the container
    pub(crate) directory: usize,

    /// Level width in pixels
    pub(crate) width: u64,

    /// Level height in pixels
    pub(crate) height: u64,

    /// Tile width in pixels
    pub(crate) tile_width: u32,

    /// Tile height in pixels
    pub(crate) tile_height: u32,

    /// Downsample factor relative to level 0; fixed up after the levels
    /// are sorted
    pub(crate) downsample: f64,

    /// Compression scheme of the tile streams
    pub(crate) compression: Compression,

    /// Byte offset of each tile in the file, row-major
    pub(crate) tile_offsets: Vec<u64>,

    /// Byte count of each tile; zero marks a tile with no data
    pub(crate) tile_byte_counts: Vec<u64>,

    /// Shared JPEG tables for abbreviated tile streams
    pub(crate) jpeg_tables: Option<Bytes>,

    /// Tile grid geometry for region painting
    pub(crate) grid: TileGrid,
}

fn field<T>(
    result: Result<T, TiffError>,
    directory: usize,
    field: &'static str,
) -> Result<T, OpenError> {
    result.map_err(|source| OpenError::FieldRead {
        directory,
        field,
        source,
    })
}

fn bad_value(directory: usize, tag: TiffTag, message: &str) -> TiffError {
    TiffError::InvalidTagValue {
        directory,
        tag: tag.as_u16(),
        message: message.to_string(),
    }
}

impl Level {
    /// Build a level from a tiled directory.
    ///
    /// Reads the geometry and the full tile location tables; any missing
    /// or malformed field is a hard failure. The caller has already
    /// verified the compression scheme.
    pub(crate) fn from_directory(
        dump: &TiffDump,
        directory: usize,
        compression: Compression,
    ) -> Result<Self, OpenError> {
        let width = field(dump.get_u64(directory, TiffTag::ImageWidth), directory, "ImageWidth")?;
        let height = field(
            dump.get_u64(directory, TiffTag::ImageLength),
            directory,
            "ImageLength",
        )?;
        let tile_width = field(dump.get_u32(directory, TiffTag::TileWidth), directory, "TileWidth")?;
        let tile_height = field(
            dump.get_u32(directory, TiffTag::TileLength),
            directory,
            "TileLength",
        )?;

        if width == 0 || height == 0 {
            return Err(OpenError::FieldRead {
                directory,
                field: "ImageWidth",
                source: bad_value(directory, TiffTag::ImageWidth, "image dimensions must be nonzero"),
            });
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(OpenError::FieldRead {
                directory,
                field: "TileWidth",
                source: bad_value(directory, TiffTag::TileWidth, "tile dimensions must be nonzero"),
            });
        }

        let tiles_across = (width + tile_width as u64 - 1) / tile_width as u64;
        let tiles_down = (height + tile_height as u64 - 1) / tile_height as u64;
        let tile_count = tiles_across * tiles_down;
        let (tiles_across, tiles_down) = match (u32::try_from(tiles_across), u32::try_from(tiles_down))
        {
            (Ok(a), Ok(d)) => (a, d),
            _ => {
                return Err(OpenError::FieldRead {
                    directory,
                    field: "ImageWidth",
                    source: bad_value(directory, TiffTag::ImageWidth, "tile grid too large"),
                })
            }
        };

        let tile_offsets = field(
            dump.get_u64_array(directory, TiffTag::TileOffsets),
            directory,
            "TileOffsets",
        )?;
        let tile_byte_counts = field(
            dump.get_u64_array(directory, TiffTag::TileByteCounts),
            directory,
            "TileByteCounts",
        )?;

        if tile_offsets.len() as u64 != tile_count {
            return Err(OpenError::FieldRead {
                directory,
                field: "TileOffsets",
                source: bad_value(
                    directory,
                    TiffTag::TileOffsets,
                    &format!(
                        "declares {} tiles, level geometry needs {}",
                        tile_offsets.len(),
                        tile_count
                    ),
                ),
            });
        }
        if tile_byte_counts.len() != tile_offsets.len() {
            return Err(OpenError::FieldRead {
                directory,
                field: "TileByteCounts",
                source: bad_value(
                    directory,
                    TiffTag::TileByteCounts,
                    &format!(
                        "declares {} tiles, level geometry needs {}",
                        tile_byte_counts.len(),
                        tile_count
                    ),
                ),
            });
        }

        let jpeg_tables = if dump.has_tag(directory, TiffTag::JpegTables) {
            Some(field(
                dump.get_buffer(directory, TiffTag::JpegTables),
                directory,
                "JPEGTables",
            )?)
        } else {
            None
        };

        Ok(Level {
            directory,
            width,
            height,
            tile_width,
            tile_height,
            downsample: 1.0,
            compression,
            tile_offsets,
            tile_byte_counts,
            jpeg_tables,
            grid: TileGrid::new(tiles_across, tiles_down, tile_width, tile_height),
        })
    }

    /// Row-major index of a tile, or `None` outside the grid.
    pub(crate) fn tile_index(&self, col: u32, row: u32) -> Option<usize> {
        if col >= self.grid.tiles_across() || row >= self.grid.tiles_down() {
            return None;
        }
        Some(row as usize * self.grid.tiles_across() as usize + col as usize)
    }

    /// Pixel extent of a tile that lies within the level bounds.
    ///
    /// Interior tiles are full-size; tiles in the last column or row only
    /// cover the remainder of the level.
    pub(crate) fn tile_valid_dimensions(&self, col: u32, row: u32) -> (u32, u32) {
        let remaining_w = self.width.saturating_sub(col as u64 * self.tile_width as u64);
        let remaining_h = self
            .height
            .saturating_sub(row as u64 * self.tile_height as u64);
        (
            remaining_w.min(self.tile_width as u64) as u32,
            remaining_h.min(self.tile_height as u64) as u32,
        )
    }

    /// Metadata snapshot for this level.
    pub(crate) fn info(&self) -> LevelInfo {
        LevelInfo {
            width: self.width,
            height: self.height,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            tiles_across: self.grid.tiles_across(),
            tiles_down: self.grid.tiles_down(),
            downsample: self.downsample,
        }
    }
}

// =============================================================================
// Level Information
// =============================================================================

/// Metadata about a single pyramid level.
///
/// A snapshot that can be queried without async operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelInfo {
    /// Width of this level in pixels
    pub width: u64,

    /// Height of this level in pixels
    pub height: u64,

    /// Width of each tile in pixels
    pub tile_width: u32,

    /// Height of each tile in pixels
    pub tile_height: u32,

    /// Number of tile columns
    pub tiles_across: u32,

    /// Number of tile rows
    pub tiles_down: u32,

    /// Downsample factor relative to level 0
    ///
    /// Level 0 has downsample 1.0; smaller levels have larger values.
    pub downsample: f64,
}

// =============================================================================
// Tests
// =============================================================================

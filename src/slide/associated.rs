//! Associated images: small non-pyramidal pictures stored alongside the
//! pyramid, such as a label scan, a macro shot, or the thumbnail.
//!
//! Geometry and tile tables are captured once while the slide is opened,
//! so a later read never touches the directory structure again. Reads
//! are not cached; these images are small and requested rarely.

use bytes::Bytes;

use crate::error::{TiffError, TileError};
use crate::format::tiff::{Compression, TiffDump, TiffTag};
use crate::io::RangeReader;
use crate::slide::pool::DecoderPool;
use crate::tile::{clip_tile, decode_tile, Canvas};

// =============================================================================
// Associated Image
// =============================================================================

/// A non-pyramidal image registered under a name.
#[derive(Debug, Clone)]
pub(crate) struct AssociatedImage {
    /// Index of the backing directory in the container
    pub(crate) directory: usize,

    /// Image width in pixels
    pub(crate) width: u32,

    /// Image height in pixels
    pub(crate) height: u32,

    /// Tile width in pixels
    tile_width: u32,

    /// Tile height in pixels
    tile_height: u32,

    /// Raw compression code; validated when the image is read
    compression_code: u16,

    /// Byte offset of each tile in the file, row-major
    tile_offsets: Vec<u64>,

    /// Byte count of each tile; zero marks a tile with no data
    tile_byte_counts: Vec<u64>,

    /// Shared JPEG tables for abbreviated tile streams
    jpeg_tables: Option<Bytes>,
}

impl AssociatedImage {
    /// Capture the geometry of a tiled directory.
    ///
    /// The compression code is recorded as-is; whether a decoder exists
    /// for it only matters once the image is actually read.
    pub(crate) fn from_directory(dump: &TiffDump, directory: usize) -> Result<Self, TiffError> {
        let width = dump.get_u32(directory, TiffTag::ImageWidth)?;
        let height = dump.get_u32(directory, TiffTag::ImageLength)?;
        let tile_width = dump.get_u32(directory, TiffTag::TileWidth)?;
        let tile_height = dump.get_u32(directory, TiffTag::TileLength)?;

        if width == 0 || height == 0 || tile_width == 0 || tile_height == 0 {
            return Err(TiffError::InvalidTagValue {
                directory,
                tag: TiffTag::ImageWidth.as_u16(),
                message: "image and tile dimensions must be nonzero".to_string(),
            });
        }

        let compression_code = if dump.has_tag(directory, TiffTag::Compression) {
            u16::try_from(dump.get_u64(directory, TiffTag::Compression)?).map_err(|_| {
                TiffError::InvalidTagValue {
                    directory,
                    tag: TiffTag::Compression.as_u16(),
                    message: "compression code out of range".to_string(),
                }
            })?
        } else {
            Compression::None.code()
        };

        let tile_offsets = dump.get_u64_array(directory, TiffTag::TileOffsets)?;
        let tile_byte_counts = dump.get_u64_array(directory, TiffTag::TileByteCounts)?;

        let tiles_across = (width as u64 + tile_width as u64 - 1) / tile_width as u64;
        let tiles_down = (height as u64 + tile_height as u64 - 1) / tile_height as u64;
        let tile_count = (tiles_across * tiles_down) as usize;
        if tile_offsets.len() != tile_count || tile_byte_counts.len() != tile_count {
            return Err(TiffError::InvalidTagValue {
                directory,
                tag: TiffTag::TileOffsets.as_u16(),
                message: format!(
                    "tile tables declare {} entries, image geometry needs {}",
                    tile_offsets.len().min(tile_byte_counts.len()),
                    tile_count
                ),
            });
        }

        let jpeg_tables = if dump.has_tag(directory, TiffTag::JpegTables) {
            Some(dump.get_buffer(directory, TiffTag::JpegTables)?)
        } else {
            None
        };

        Ok(AssociatedImage {
            directory,
            width,
            height,
            tile_width,
            tile_height,
            compression_code,
            tile_offsets,
            tile_byte_counts,
            jpeg_tables,
        })
    }

    fn tiles_across(&self) -> u32 {
        (self.width + self.tile_width - 1) / self.tile_width
    }

    fn tiles_down(&self) -> u32 {
        (self.height + self.tile_height - 1) / self.tile_height
    }

    /// Decode the whole image into an RGBA canvas.
    pub(crate) async fn read(
        &self,
        reader: &dyn RangeReader,
        pool: &DecoderPool,
    ) -> Result<Canvas, TileError> {
        let compression = Compression::from_u16(self.compression_code)
            .ok_or(TileError::UnsupportedCompression(self.compression_code))?;

        let mut canvas = Canvas::new(self.width, self.height);
        for row in 0..self.tiles_down() {
            for col in 0..self.tiles_across() {
                let index = row as usize * self.tiles_across() as usize + col as usize;
                let count = self.tile_byte_counts[index];
                if count == 0 {
                    continue;
                }

                let data = reader.read_exact_at(self.tile_offsets[index], count as usize).await?;

                let permit = pool.acquire().await;
                let mut tile = decode_tile(
                    compression,
                    &data,
                    self.jpeg_tables.as_deref(),
                    self.tile_width,
                    self.tile_height,
                )
                .map_err(|reason| TileError::Decode { col, row, reason })?;
                drop(permit);

                let valid_w = (self.width - col * self.tile_width).min(self.tile_width);
                let valid_h = (self.height - row * self.tile_height).min(self.tile_height);
                if valid_w < self.tile_width || valid_h < self.tile_height {
                    clip_tile(&mut tile, valid_w, valid_h);
                }

                canvas.blit(
                    &tile,
                    col as i64 * self.tile_width as i64,
                    row as i64 * self.tile_height as i64,
                );
            }
        }

        Ok(canvas)
    }
}

// =============================================================================
// Tests
// =============================================================================

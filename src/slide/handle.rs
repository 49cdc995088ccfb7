//! The open-slide handle.
//!
//! A [`Slide`] owns everything needed to serve reads: the range reader,
//! the pyramid levels with their tile tables, the property map, the
//! associated images, the decoded-tile cache, and the decoder pool. All
//! of it is assembled by a vendor backend before the handle is handed
//! out, so a `Slide` is always fully usable.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::TileError;
use crate::io::RangeReader;
use crate::slide::associated::AssociatedImage;
use crate::slide::level::{Level, LevelInfo};
use crate::slide::pool::DecoderPool;
use crate::tile::{clip_tile, decode_tile, CacheStats, Canvas, TileCache, TileKey, TilePainter};

// =============================================================================
// Slide
// =============================================================================

/// An open whole-slide image.
///
/// Read methods take `&self`; a `Slide` can be shared across tasks
/// behind an [`Arc`]. Decoded tiles are cached per slide, so repeated
/// reads of overlapping regions decode each tile once.
pub struct Slide {
    reader: Arc<dyn RangeReader>,
    levels: Vec<Level>,
    properties: BTreeMap<String, String>,
    associated: HashMap<String, AssociatedImage>,
    cache: Arc<TileCache>,
    pool: DecoderPool,
}

impl Slide {
    pub(crate) fn new(
        reader: Arc<dyn RangeReader>,
        levels: Vec<Level>,
        properties: BTreeMap<String, String>,
        associated: HashMap<String, AssociatedImage>,
        cache: Arc<TileCache>,
        pool: DecoderPool,
    ) -> Self {
        Slide {
            reader,
            levels,
            properties,
            associated,
            cache,
            pool,
        }
    }

    pub(crate) fn insert_property(&mut self, name: &str, value: String) {
        self.properties.insert(name.to_string(), value);
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Dimensions of level 0 in pixels.
    pub fn dimensions(&self) -> (u64, u64) {
        self.levels
            .first()
            .map(|level| (level.width, level.height))
            .unwrap_or((0, 0))
    }

    /// Number of pyramid levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Metadata for one level, or `None` if the index is out of range.
    pub fn level_info(&self, level: usize) -> Option<LevelInfo> {
        self.levels.get(level).map(Level::info)
    }

    /// Metadata for every level, ordered from largest to smallest.
    pub fn levels(&self) -> Vec<LevelInfo> {
        self.levels.iter().map(Level::info).collect()
    }

    /// The level whose downsample is closest to `downsample` without
    /// going over.
    ///
    /// Requests below level 0's downsample return level 0; requests
    /// beyond the smallest level return the smallest level.
    pub fn best_level_for_downsample(&self, downsample: f64) -> usize {
        let Some(first) = self.levels.first() else {
            return 0;
        };
        if downsample < first.downsample {
            return 0;
        }
        for (index, level) in self.levels.iter().enumerate().skip(1) {
            if downsample < level.downsample {
                return index - 1;
            }
        }
        self.levels.len() - 1
    }

    // =========================================================================
    // Pixel Reads
    // =========================================================================

    /// Read a region of the slide into an RGBA canvas.
    ///
    /// `x` and `y` are in level 0 coordinates; `width` and `height` are
    /// in the coordinates of the requested level. Pixels outside the
    /// level bounds come back transparent.
    pub async fn read_region(
        &self,
        x: i64,
        y: i64,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<Canvas, TileError> {
        let lvl = self.levels.get(level).ok_or(TileError::InvalidLevel {
            level,
            level_count: self.levels.len(),
        })?;

        tracing::trace!(x, y, level, width, height, "reading region");

        let mut canvas = Canvas::new(width, height);
        if width == 0 || height == 0 {
            return Ok(canvas);
        }

        let origin_x = x as f64 / lvl.downsample;
        let origin_y = y as f64 / lvl.downsample;

        let painter = LevelPainter {
            reader: self.reader.as_ref(),
            level: lvl,
            level_index: level,
            cache: &self.cache,
            pool: &self.pool,
        };
        lvl.grid
            .paint_region(&painter, &mut canvas, origin_x, origin_y)
            .await?;
        Ok(canvas)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// All properties, sorted by name.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Look up a single property value.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    // =========================================================================
    // Associated Images
    // =========================================================================

    /// Names of the associated images, sorted.
    pub fn associated_image_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.associated.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dimensions of a named associated image.
    pub fn associated_image_dimensions(&self, name: &str) -> Option<(u32, u32)> {
        self.associated.get(name).map(|image| (image.width, image.height))
    }

    /// Decode a named associated image into an RGBA canvas.
    pub async fn read_associated_image(&self, name: &str) -> Result<Canvas, TileError> {
        let image = self
            .associated
            .get(name)
            .ok_or_else(|| TileError::NoSuchAssociatedImage(name.to_string()))?;
        image.read(self.reader.as_ref(), &self.pool).await
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Counters from the decoded-tile cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Serializable snapshot of the slide's structure.
    pub fn info(&self) -> SlideInfo {
        let (width, height) = self.dimensions();
        let mut associated_images: Vec<AssociatedImageInfo> = self
            .associated
            .iter()
            .map(|(name, image)| AssociatedImageInfo {
                name: name.clone(),
                width: image.width,
                height: image.height,
            })
            .collect();
        associated_images.sort_unstable_by(|a, b| a.name.cmp(&b.name));

        SlideInfo {
            width,
            height,
            level_count: self.levels.len(),
            levels: self.levels.iter().map(Level::info).collect(),
            associated_images,
        }
    }
}

impl fmt::Debug for Slide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slide")
            .field("source", &self.reader.identifier())
            .field("levels", &self.levels.len())
            .field("associated_images", &self.associated.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

// =============================================================================
// Slide Information
// =============================================================================

/// Structural metadata for a named associated image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociatedImageInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Serializable snapshot of an open slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideInfo {
    /// Level 0 width in pixels
    pub width: u64,

    /// Level 0 height in pixels
    pub height: u64,

    /// Number of pyramid levels
    pub level_count: usize,

    /// Per-level metadata, largest level first
    pub levels: Vec<LevelInfo>,

    /// Associated images, sorted by name
    pub associated_images: Vec<AssociatedImageInfo>,
}

// =============================================================================
// Level Painter
// =============================================================================

/// Paints tiles of one level through the cache.
struct LevelPainter<'a> {
    reader: &'a dyn RangeReader,
    level: &'a Level,
    level_index: usize,
    cache: &'a TileCache,
    pool: &'a DecoderPool,
}

#[async_trait]
impl TilePainter for LevelPainter<'_> {
    async fn paint_tile(
        &self,
        col: u32,
        row: u32,
        canvas: &mut Canvas,
        dst_x: i64,
        dst_y: i64,
    ) -> Result<(), TileError> {
        let key = TileKey::new(self.level_index, col, row);
        if let Some(tile) = self.cache.get(&key).await {
            canvas.blit(&tile, dst_x, dst_y);
            return Ok(());
        }

        let index = self.level.tile_index(col, row).ok_or(TileError::MissingTile {
            directory: self.level.directory,
            col,
            row,
        })?;

        // Zero-length tiles carry no data; the region stays transparent.
        let count = self.level.tile_byte_counts[index];
        if count == 0 {
            return Ok(());
        }

        let data = self
            .reader
            .read_exact_at(self.level.tile_offsets[index], count as usize)
            .await?;

        let permit = self.pool.acquire().await;
        let mut tile = decode_tile(
            self.level.compression,
            &data,
            self.level.jpeg_tables.as_deref(),
            self.level.tile_width,
            self.level.tile_height,
        )
        .map_err(|reason| TileError::Decode { col, row, reason })?;
        drop(permit);

        let (valid_w, valid_h) = self.level.tile_valid_dimensions(col, row);
        if valid_w < self.level.tile_width || valid_h < self.level.tile_height {
            clip_tile(&mut tile, valid_w, valid_h);
        }

        let tile = self.cache.put(key, tile).await;
        canvas.blit(&tile, dst_x, dst_y);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

//! # WSI Reader
//!
//! A reader for vendor whole-slide image (WSI) formats.
//!
//! Slide scanners produce multi-gigabyte pyramidal images wrapped in
//! vendor-specific TIFF containers. This library detects the vendor,
//! builds the resolution pyramid, and serves arbitrary RGBA regions of
//! any level, with decoded tiles cached per slide. Opening is
//! all-or-nothing: a returned [`Slide`] is always fully usable, and a
//! failed open leaves nothing behind.
//!
//! ## Features
//!
//! - **Vendor detection**: structural checks identify the format before
//!   any pixel data is read
//! - **Region reads**: any rectangle of any pyramid level, painted from
//!   JPEG and JPEG 2000 tiles with edge clipping and sparse-tile handling
//! - **Decoded-tile cache**: byte-budgeted LRU shared by all reads of a
//!   slide, so overlapping regions decode each tile once
//! - **Associated images**: labels, macros, and the thumbnail exposed by
//!   name
//! - **Properties**: vendor metadata, container metadata, and a content
//!   fingerprint as flat key/value pairs
//!
//! ## Architecture
//!
//! - [`io`] - range readers over local files
//! - [`mod@format`] - TIFF container parsing and vendor backends
//! - [`slide`] - the open slide handle, levels, and associated images
//! - [`tile`] - tile decoding, caching, and region painting
//! - [`config`] - open-time options
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_reader::OpenError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), OpenError> {
//!     let slide = wsi_reader::open("slides/case-041.tiff").await?;
//!
//!     let (width, height) = slide.dimensions();
//!     println!("{width}x{height}, {} levels", slide.level_count());
//!
//!     if let Some(power) = slide.property(wsi_reader::slide::PROPERTY_OBJECTIVE_POWER) {
//!         println!("scanned at {power}x");
//!     }
//!
//!     let level = slide.best_level_for_downsample(16.0);
//!     let overview = slide.read_region(0, 0, level, 1024, 1024).await;
//!     # let _ = overview;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod slide;
pub mod tile;

use std::path::Path;
use std::sync::Arc;

// Re-export commonly used types
pub use config::OpenOptions;
pub use error::{DetectError, IoError, OpenError, TiffError, TileError};
pub use format::tiff::{
    ByteOrder, Compression, FieldType, TiffDump, TiffEntry, TiffHeader, TiffTag,
    BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};
pub use io::{FileRangeReader, RangeReader};
pub use slide::{
    AssociatedImageInfo, DecoderPool, LevelInfo, Slide, SlideInfo, PROPERTY_MPP_X, PROPERTY_MPP_Y,
    PROPERTY_OBJECTIVE_POWER, PROPERTY_QUICKHASH1, PROPERTY_VENDOR,
};
pub use tile::{CacheStats, Canvas, TileBuffer, TileCache, TileKey, DEFAULT_CACHE_CAPACITY};

/// Open a slide file with default options.
pub async fn open(path: impl AsRef<Path>) -> Result<Slide, OpenError> {
    open_with_options(path, OpenOptions::default()).await
}

/// Open a slide file with explicit options.
pub async fn open_with_options(
    path: impl AsRef<Path>,
    options: OpenOptions,
) -> Result<Slide, OpenError> {
    let reader = FileRangeReader::open(path).await?;
    open_from_reader(Arc::new(reader), options).await
}

/// Open a slide through any range reader.
///
/// This is the entry point for sources other than local files; anything
/// implementing [`RangeReader`] works.
pub async fn open_from_reader(
    reader: Arc<dyn RangeReader>,
    options: OpenOptions,
) -> Result<Slide, OpenError> {
    format::open(reader, &options).await
}

/// Name the vendor of a slide file without opening it.
pub async fn detect_vendor(path: impl AsRef<Path>) -> Result<&'static str, DetectError> {
    let reader = FileRangeReader::open(path)
        .await
        .map_err(|e| DetectError::not_recognized(format!("cannot open file: {e}")))?;
    detect_vendor_from_reader(&reader).await
}

/// Name the vendor of a container behind any range reader.
pub async fn detect_vendor_from_reader(
    reader: &dyn RangeReader,
) -> Result<&'static str, DetectError> {
    format::detect_vendor(reader).await
}

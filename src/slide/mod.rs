//! The slide abstraction layer.
//!
//! This module holds everything an open slide is made of: the pyramid
//! levels, the property map, the associated images, and the bounded
//! decoder pool. Vendor backends in [`crate::format`] assemble these
//! pieces; applications only ever see the finished [`Slide`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 Slide                   │
//! │  (read_region, properties, associated)  │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┼───────────────┐
//!          ▼           ▼               ▼
//! ┌──────────────┐ ┌─────────────┐ ┌──────────────────┐
//! │    Level     │ │ Associated  │ │   DecoderPool    │
//! │ (tile tables │ │   Image     │ │ (bounds parallel │
//! │  + geometry) │ │ (label etc.)│ │     decodes)     │
//! └──────────────┘ └─────────────┘ └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wsi_reader::Slide;
//!
//! let slide = wsi_reader::open("slides/case-041.tiff").await?;
//!
//! println!("{}x{}", slide.dimensions().0, slide.dimensions().1);
//! for (name, value) in slide.properties() {
//!     println!("{name} = {value}");
//! }
//!
//! // Read a 512x512 region at the level closest to 8x downsampling
//! let level = slide.best_level_for_downsample(8.0);
//! let region = slide.read_region(10_000, 20_000, level, 512, 512).await?;
//! ```

mod associated;
mod handle;
mod level;
mod pool;
mod properties;

pub use handle::{AssociatedImageInfo, Slide, SlideInfo};
pub use level::LevelInfo;
pub use pool::DecoderPool;
pub use properties::{
    PROPERTY_MPP_X, PROPERTY_MPP_Y, PROPERTY_OBJECTIVE_POWER, PROPERTY_QUICKHASH1, PROPERTY_VENDOR,
};

pub(crate) use associated::AssociatedImage;
pub(crate) use level::Level;
pub(crate) use pool::default_decoder_capacity;
pub(crate) use properties::{add_tiff_properties, duplicate_double_prop, duplicate_int_prop};

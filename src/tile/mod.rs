//! Tile painting layer.
//!
//! This module turns compressed tile streams into RGBA8 pixels and
//! composites them into region reads.
//!
//! # Architecture
//!
//! The painting layer sits between the slide abstraction and the
//! container format:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Slide::read_region            │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               TileGrid                  │
//! │   region rect → covered tile indices    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         TilePainter (per level)         │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileCache   │  │  tile decoding  │  │
//! │  │  (decoded    │  │  (JPEG and      │  │
//! │  │   RGBA)      │  │   JPEG 2000)    │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             Canvas (RGBA8)              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileCache`]: LRU cache of decoded tiles, shared by every read on one slide
//! - [`TileKey`]: Cache key (level, column, row)
//! - [`TileBuffer`]: One decoded tile's pixels, handed out behind `Arc`
//! - [`CacheStats`]: Hit/miss counters for the cache
//! - [`Canvas`]: Destination surface that tiles are blitted onto
//!
//! The grid arithmetic, the painter seam, and the codec dispatch are
//! internal to the crate.
//!
//! # Example
//!
//! ```
//! use wsi_reader::tile::{TileBuffer, TileCache, TileKey};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Cache with an 8MB pixel budget
//!     let cache = TileCache::with_capacity(8 * 1024 * 1024);
//!
//!     let key = TileKey::new(0, 1, 2);
//!     if cache.get(&key).await.is_none() {
//!         // Decode would happen here; the handle keeps the pixels
//!         // alive even if the entry is evicted later.
//!         let handle = cache.put(key, TileBuffer::blank(240, 240)).await;
//!         assert_eq!(handle.byte_size(), 240 * 240 * 4);
//!     }
//! }
//! ```

mod cache;
mod canvas;
mod decode;
mod grid;

pub use cache::{CacheStats, TileBuffer, TileCache, TileKey, DEFAULT_CACHE_CAPACITY};
pub use canvas::Canvas;
pub(crate) use decode::{clip_tile, decode_tile};
pub(crate) use grid::{TileGrid, TilePainter};

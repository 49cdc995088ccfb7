//! Cache for decoded tile pixel data.
//!
//! Decoding a tile is far more expensive than compositing it, so decoded
//! tiles are kept in a per-slide LRU cache and shared between overlapping
//! region reads. Entries are handed out as `Arc<TileBuffer>` clones: a
//! buffer stays alive for as long as any caller holds a handle to it, even
//! if the cache evicts the entry in the meantime.
//!
//! # Cache Key
//!
//! Tiles are cached by pyramid level and tile grid coordinates. The cache
//! belongs to a single open slide, so the key carries no slide identity.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the total pixel bytes held and evicts
//! least-recently-used entries when the capacity is exceeded. An entry
//! larger than the whole budget is evicted on the spot; the handle returned
//! from `put` keeps its pixels usable regardless.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use serde::Serialize;
use tokio::sync::RwLock;

/// Default cache capacity: 32MB of decoded pixels.
pub const DEFAULT_CACHE_CAPACITY: usize = 32 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for decoded tiles within one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Pyramid level (0 = highest resolution)
    pub level: usize,

    /// Tile column (0-indexed from left)
    pub col: u32,

    /// Tile row (0-indexed from top)
    pub row: u32,
}

impl TileKey {
    /// Create a new cache key.
    pub fn new(level: usize, col: u32, row: u32) -> Self {
        Self { level, col, row }
    }
}

// =============================================================================
// Tile Buffer
// =============================================================================

/// Decoded tile pixels in premultiplied RGBA8, row-major.
///
/// The pixel vector length is always `width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TileBuffer {
    /// Wrap decoded pixels. `pixels` must hold exactly `width * height`
    /// RGBA8 values.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Allocate a fully transparent tile.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Tile width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Tile height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 pixel data, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable pixel data, for decoders filling the buffer in place.
    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Size of the pixel data in bytes, used as the cache cost.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}

// =============================================================================
// Cache Statistics
// =============================================================================

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found a decoded tile.
    pub hits: u64,

    /// Lookups that required a decode.
    pub misses: u64,
}

// =============================================================================
// Tile Cache
// =============================================================================

/// LRU cache for decoded tiles with size-based capacity.
///
/// The cache stores `Arc<TileBuffer>` entries and evicts least-recently-used
/// tiles once the total pixel bytes exceed capacity.
///
/// # Thread Safety
///
/// The cache is thread-safe and is shared across async tasks via `Arc`.
pub struct TileCache {
    /// The underlying LRU cache
    cache: RwLock<LruCache<TileKey, Arc<TileBuffer>>>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Current total size in bytes
    current_size: RwLock<usize>,

    /// Lookups that found an entry
    hits: AtomicU64,

    /// Lookups that found nothing
    misses: AtomicU64,
}

impl TileCache {
    /// Create a new tile cache with default capacity (32MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new tile cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a new tile cache with specified capacity and maximum entries.
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum total size of cached pixels in bytes
    /// * `max_entries` - Maximum number of entries in the cache
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                std::num::NonZeroUsize::new(max_entries.max(1)).unwrap(),
            )),
            max_size,
            current_size: RwLock::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a tile from the cache.
    ///
    /// Returns a shared handle if the tile is cached, `None` otherwise.
    /// This operation marks the entry as recently used and counts toward
    /// the hit/miss statistics.
    pub async fn get(&self, key: &TileKey) -> Option<Arc<TileBuffer>> {
        let mut cache = self.cache.write().await;
        match cache.get(key) {
            Some(tile) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(tile))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check if a tile is in the cache without updating LRU order.
    pub async fn contains(&self, key: &TileKey) -> bool {
        let cache = self.cache.read().await;
        cache.contains(key)
    }

    /// Store a decoded tile and return a shared handle to it.
    ///
    /// If the cache is over capacity after insertion, least-recently-used
    /// entries are evicted until the cache is within capacity. The returned
    /// handle is valid even when the entry itself was evicted immediately.
    ///
    /// If the tile already exists, it is replaced and marked as recently
    /// used.
    pub async fn put(&self, key: TileKey, tile: TileBuffer) -> Arc<TileBuffer> {
        let tile = Arc::new(tile);
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        // push reports the displaced entry both when replacing this key and
        // when the entry bound forces out the LRU entry
        if let Some((_, displaced)) = cache.push(key, Arc::clone(&tile)) {
            *current_size = current_size.saturating_sub(displaced.byte_size());
        }
        *current_size += tile.byte_size();

        // Evict entries until we're under capacity
        while *current_size > self.max_size {
            if let Some((_, evicted)) = cache.pop_lru() {
                *current_size = current_size.saturating_sub(evicted.byte_size());
            } else {
                break;
            }
        }

        tile
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Get the current number of cached tiles.
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        let cache = self.cache.read().await;
        cache.is_empty()
    }

    /// Get the current total size of cached pixels in bytes.
    pub async fn size(&self) -> usize {
        let current_size = self.current_size.read().await;
        *current_size
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Get the hit/miss counters accumulated so far.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

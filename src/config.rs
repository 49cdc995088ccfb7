//! Open-time options for slide handles.
//!
//! Every option has a workable default; `wsi_reader::open` uses
//! [`OpenOptions::default`] and most callers never touch this module.
//!
//! # Example
//!
//! ```ignore
//! use wsi_reader::OpenOptions;
//!
//! let options = OpenOptions::new()
//!     .cache_capacity_bytes(64 * 1024 * 1024)
//!     .max_decoders(8);
//!
//! let slide = wsi_reader::open_with_options("slide.tiff", options).await?;
//! ```

use crate::slide::default_decoder_capacity;
use crate::tile::DEFAULT_CACHE_CAPACITY;

// =============================================================================
// Open Options
// =============================================================================

/// Tuning knobs applied when a slide is opened.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Decoded-tile cache budget in bytes.
    pub(crate) cache_capacity_bytes: usize,

    /// Maximum number of tiles decoded concurrently.
    pub(crate) max_decoders: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            cache_capacity_bytes: DEFAULT_CACHE_CAPACITY,
            max_decoders: default_decoder_capacity(),
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the decoded-tile cache budget in bytes.
    ///
    /// A budget of zero disables caching; every read decodes its tiles.
    pub fn cache_capacity_bytes(mut self, bytes: usize) -> Self {
        self.cache_capacity_bytes = bytes;
        self
    }

    /// Set the number of tiles decoded concurrently.
    ///
    /// Values below 1 are raised to 1.
    pub fn max_decoders(mut self, count: usize) -> Self {
        self.max_decoders = count.max(1);
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

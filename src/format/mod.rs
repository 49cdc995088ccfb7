//! Vendor format backends and dispatch.
//!
//! Every supported scanner vendor contributes a [`VendorBackend`]: a
//! cheap structural `detect` plus an `open` that assembles a complete
//! [`Slide`]. Dispatch parses the TIFF structure once, asks each backend
//! in turn, and hands the container to the first one that recognizes it.
//!
//! Detection never partially opens a slide. `open` either returns a
//! fully usable handle or an error with nothing left behind.

pub(crate) mod jpeg;
mod optra;
pub mod tiff;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::OpenOptions;
use crate::error::{DetectError, OpenError};
use crate::io::RangeReader;
use crate::slide::{Slide, PROPERTY_VENDOR};

use tiff::TiffDump;

// =============================================================================
// Backend Trait
// =============================================================================

/// A vendor-specific slide format backend.
#[async_trait]
trait VendorBackend: Send + Sync {
    /// Short lowercase vendor name, also published as the vendor
    /// property of opened slides.
    fn vendor(&self) -> &'static str;

    /// Decide whether this backend can open the container.
    ///
    /// Works entirely on the parsed directory structure; no pixel data
    /// is touched.
    fn detect(&self, dump: &TiffDump) -> Result<(), DetectError>;

    /// Build a slide from a recognized container.
    async fn open(
        &self,
        reader: Arc<dyn RangeReader>,
        dump: TiffDump,
        options: &OpenOptions,
    ) -> Result<Slide, OpenError>;
}

/// All known backends, in detection order.
static BACKENDS: &[&(dyn VendorBackend)] = &[&optra::OptraBackend];

// =============================================================================
// Dispatch
// =============================================================================

/// Name the vendor whose backend recognizes the container, without
/// opening it.
pub(crate) async fn detect_vendor(reader: &dyn RangeReader) -> Result<&'static str, DetectError> {
    let dump = TiffDump::parse(reader)
        .await
        .map_err(|e| DetectError::not_recognized(format!("not a TIFF container: {e}")))?;

    for backend in BACKENDS {
        match backend.detect(&dump) {
            Ok(()) => return Ok(backend.vendor()),
            Err(DetectError::NotRecognized { reason }) => {
                debug!(vendor = backend.vendor(), %reason, "backend rejected container");
            }
        }
    }
    Err(DetectError::not_recognized(
        "no backend recognizes this container",
    ))
}

/// Open a slide with the first backend that recognizes the container.
pub(crate) async fn open(
    reader: Arc<dyn RangeReader>,
    options: &OpenOptions,
) -> Result<Slide, OpenError> {
    let dump = match TiffDump::parse(reader.as_ref()).await {
        Ok(dump) => dump,
        Err(e) => {
            debug!(identifier = reader.identifier(), error = %e, "not a TIFF container");
            return Err(OpenError::FormatNotRecognized);
        }
    };

    let mut chosen = None;
    for backend in BACKENDS {
        match backend.detect(&dump) {
            Ok(()) => {
                chosen = Some(backend);
                break;
            }
            Err(DetectError::NotRecognized { reason }) => {
                debug!(vendor = backend.vendor(), %reason, "backend rejected container");
            }
        }
    }
    let Some(backend) = chosen else {
        return Err(OpenError::FormatNotRecognized);
    };

    let mut slide = backend.open(reader, dump, options).await?;
    slide.insert_property(PROPERTY_VENDOR, backend.vendor().to_string());
    Ok(slide)
}

//! Optra format backend.
//!
//! Optra scanners (.tif, .otif) write a tiled TIFF whose first directory
//! carries an XMLPacket with a `ScanInfo` document describing the scan.
//!
//! # Optra File Structure
//!
//! - **Pyramid levels**: every tiled directory that is not flagged as
//!   metadata. Directory 0 is the full-resolution scan; reduced-image
//!   directories hold progressively smaller versions.
//! - **Metadata pages**: tiled directories without the reduced-image
//!   flag. Each becomes an associated image named by its
//!   ImageDescription (label, macro, ...).
//! - **Thumbnail**: the last reduced directory larger than 500x500 is
//!   also registered as the "thumbnail" associated image; when none
//!   qualifies, directory 0 stands in.
//!
//! # Detection
//!
//! A container is recognized as Optra when directory 0 is tiled and its
//! XMLPacket parses as XML with a `ScanInfo` root element. All other
//! files are left for other backends.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use roxmltree::Document;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::OpenOptions;
use crate::error::{DetectError, OpenError, TiffError};
use crate::io::RangeReader;
use crate::slide::{
    add_tiff_properties, duplicate_double_prop, duplicate_int_prop, AssociatedImage, DecoderPool,
    Level, Slide, PROPERTY_MPP_X, PROPERTY_MPP_Y, PROPERTY_OBJECTIVE_POWER, PROPERTY_QUICKHASH1,
};
use crate::tile::TileCache;

use super::tiff::{Compression, TiffDump, TiffTag, SUBFILE_REDUCED_IMAGE};
use super::VendorBackend;

// =============================================================================
// Constants
// =============================================================================

/// Root element of the XMLPacket document.
const XML_ROOT_TAG: &str = "ScanInfo";

/// A reduced directory must exceed this in both dimensions to be promoted
/// to thumbnail.
const MIN_THUMBNAIL_DIM: u64 = 500;

/// Upper bound on the tile data hashed into the fingerprint.
const MAX_FINGERPRINT_BYTES: u64 = 5 * 1024 * 1024;

// =============================================================================
// Backend
// =============================================================================

pub(crate) struct OptraBackend;

#[async_trait]
impl VendorBackend for OptraBackend {
    fn vendor(&self) -> &'static str {
        "optra"
    }

    fn detect(&self, dump: &TiffDump) -> Result<(), DetectError> {
        if !dump.is_tiled(0) {
            return Err(DetectError::not_recognized("first directory is not tiled"));
        }

        let packet = dump
            .get_buffer(0, TiffTag::XmlPacket)
            .map_err(|e| DetectError::not_recognized(format!("cannot read XMLPacket: {e}")))?;

        // Cheap marker scan before committing to a full XML parse
        let text = xml_packet_text(&packet);
        if !has_scan_info_marker(text) {
            return Err(DetectError::not_recognized(format!(
                "{XML_ROOT_TAG} not in XMLPacket"
            )));
        }

        let text = std::str::from_utf8(text)
            .map_err(|_| DetectError::not_recognized("XMLPacket is not valid UTF-8"))?;
        let doc = Document::parse(text)
            .map_err(|e| DetectError::not_recognized(format!("XMLPacket parse failed: {e}")))?;
        if doc.root_element().tag_name().name() != XML_ROOT_TAG {
            return Err(DetectError::not_recognized(format!(
                "root element is not {XML_ROOT_TAG}"
            )));
        }

        Ok(())
    }

    async fn open(
        &self,
        reader: Arc<dyn RangeReader>,
        dump: TiffDump,
        options: &OpenOptions,
    ) -> Result<Slide, OpenError> {
        // Vendor XML first; a slide without it is not usable at all
        let packet = dump
            .get_buffer(0, TiffTag::XmlPacket)
            .map_err(|e| OpenError::MissingOrUnparsableXml {
                reason: format!("cannot read XMLPacket: {e}"),
            })?;
        let mut properties = BTreeMap::new();
        parse_scan_info(&packet, &mut properties)?;

        // Classify every directory: pyramid level, named associated
        // image, or thumbnail candidate
        let mut levels: Vec<Level> = Vec::new();
        let mut associated: HashMap<String, AssociatedImage> = HashMap::new();
        let mut thumbnail_directory = 0;

        for directory in 0..dump.directory_count() {
            if !dump.is_tiled(directory) {
                continue;
            }

            if directory != 0 {
                // Directories without a subfile type are skipped outright
                let Ok(subfile_type) = dump.get_u64(directory, TiffTag::NewSubfileType) else {
                    continue;
                };

                if subfile_type & SUBFILE_REDUCED_IMAGE == 0 {
                    // Metadata page: register under its own description
                    let name = dump
                        .get_string(directory, TiffTag::ImageDescription)
                        .map_err(|source| OpenError::FieldRead {
                            directory,
                            field: "ImageDescription",
                            source,
                        })?;
                    let image = AssociatedImage::from_directory(&dump, directory).map_err(
                        |source| OpenError::AssociatedImageRegistration {
                            name: name.clone(),
                            directory,
                            source,
                        },
                    )?;
                    associated.insert(name, image);
                    continue;
                }

                // Reduced image: thumbnail candidate, then a pyramid level
                let width = dump
                    .get_u64(directory, TiffTag::ImageWidth)
                    .map_err(|source| OpenError::FieldRead {
                        directory,
                        field: "ImageWidth",
                        source,
                    })?;
                let height = dump
                    .get_u64(directory, TiffTag::ImageLength)
                    .map_err(|source| OpenError::FieldRead {
                        directory,
                        field: "ImageLength",
                        source,
                    })?;
                if width > MIN_THUMBNAIL_DIM && height > MIN_THUMBNAIL_DIM {
                    // Overwritten by each later qualifying directory
                    thumbnail_directory = directory;
                }
            }

            let raw = dump
                .get_u64(directory, TiffTag::Compression)
                .map_err(|source| OpenError::FieldRead {
                    directory,
                    field: "Compression",
                    source,
                })?;
            let code = raw.min(u16::MAX as u64) as u16;
            let compression = Compression::from_u16(code)
                .filter(|c| c.is_supported())
                .ok_or(OpenError::UnsupportedCompression { directory, code })?;

            levels.push(Level::from_directory(&dump, directory, compression)?);
        }

        if levels.is_empty() {
            return Err(OpenError::NotATiledContainer);
        }

        // The thumbnail rides along as an associated image, replacing any
        // metadata page that claimed the name
        let thumbnail = AssociatedImage::from_directory(&dump, thumbnail_directory).map_err(
            |source| OpenError::ThumbnailRegistration {
                directory: thumbnail_directory,
                source,
            },
        )?;
        associated.insert("thumbnail".to_string(), thumbnail);

        // Largest level first; downsamples follow from the base width
        levels.sort_by(|a, b| b.width.cmp(&a.width));
        let base_width = levels[0].width as f64;
        for level in &mut levels {
            level.downsample = base_width / level.width as f64;
        }

        // Fingerprint the smallest level's raw tile data
        let smallest = &levels[levels.len() - 1];
        let digest = fingerprint_level(reader.as_ref(), smallest)
            .await
            .map_err(|source| OpenError::Fingerprint { source })?;
        properties.insert(PROPERTY_QUICKHASH1.to_string(), digest);

        add_tiff_properties(&mut properties, &dump);

        debug!(
            identifier = reader.identifier(),
            levels = levels.len(),
            associated = associated.len(),
            thumbnail_directory,
            "opened optra slide"
        );

        let cache = Arc::new(TileCache::with_capacity(options.cache_capacity_bytes));
        let pool = DecoderPool::new(options.max_decoders);
        Ok(Slide::new(reader, levels, properties, associated, cache, pool))
    }
}

// =============================================================================
// XMLPacket Parsing
// =============================================================================

/// XMLPacket payloads are often NUL-padded; only the leading text counts.
fn xml_packet_text(packet: &[u8]) -> &[u8] {
    match packet.iter().position(|&b| b == 0) {
        Some(end) => &packet[..end],
        None => packet,
    }
}

/// Check for the `ScanInfo` marker without parsing.
fn has_scan_info_marker(text: &[u8]) -> bool {
    text.windows(XML_ROOT_TAG.len())
        .any(|window| window == XML_ROOT_TAG.as_bytes())
}

/// Parse the ScanInfo document and publish its attributes as properties.
///
/// Every root attribute with a non-empty value becomes `optra.<name>`.
/// Magnification and PixelResolution are additionally mirrored into the
/// standard objective-power and mpp properties when they parse cleanly.
fn parse_scan_info(
    packet: &[u8],
    properties: &mut BTreeMap<String, String>,
) -> Result<(), OpenError> {
    let text = xml_packet_text(packet);
    let text = std::str::from_utf8(text).map_err(|_| OpenError::MissingOrUnparsableXml {
        reason: "XMLPacket is not valid UTF-8".to_string(),
    })?;
    let doc = Document::parse(text).map_err(|e| OpenError::MissingOrUnparsableXml {
        reason: format!("XMLPacket parse failed: {e}"),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != XML_ROOT_TAG {
        return Err(OpenError::MissingOrUnparsableXml {
            reason: format!(
                "root element '{}' is not {XML_ROOT_TAG}",
                root.tag_name().name()
            ),
        });
    }

    for attribute in root.attributes() {
        if attribute.value().is_empty() {
            continue;
        }
        properties.insert(
            format!("optra.{}", attribute.name()),
            attribute.value().to_string(),
        );
    }

    duplicate_int_prop(properties, "optra.Magnification", PROPERTY_OBJECTIVE_POWER);
    duplicate_double_prop(properties, "optra.PixelResolution", PROPERTY_MPP_X);
    duplicate_double_prop(properties, "optra.PixelResolution", PROPERTY_MPP_Y);

    Ok(())
}

// =============================================================================
// Fingerprint
// =============================================================================

/// Hash the raw tile data of one level into a content fingerprint.
///
/// The digest is SHA-256 over the undecoded tile streams in table order,
/// rendered as lowercase hex. Levels holding more than
/// [`MAX_FINGERPRINT_BYTES`] of tile data are refused.
async fn fingerprint_level(reader: &dyn RangeReader, level: &Level) -> Result<String, TiffError> {
    let total: u64 = level.tile_byte_counts.iter().sum();
    if total > MAX_FINGERPRINT_BYTES {
        return Err(TiffError::InvalidTagValue {
            directory: level.directory,
            tag: TiffTag::TileByteCounts.as_u16(),
            message: format!("{total} bytes of tile data is too much to fingerprint"),
        });
    }

    let mut hasher = Sha256::new();
    for (offset, count) in level.tile_offsets.iter().zip(&level.tile_byte_counts) {
        if *count == 0 {
            continue;
        }
        let data = reader.read_exact_at(*offset, *count as usize).await?;
        hasher.update(&data);
    }
    Ok(hex::encode(hasher.finalize()))
}

// =============================================================================
// Tests
// =============================================================================

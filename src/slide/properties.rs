//! Slide property names and property-map helpers.
//!
//! Properties are flat string key/value pairs. Reader-level names live
//! under the `wsi.` prefix; container metadata from directory 0 lives
//! under `tiff.`; vendor metadata keeps the vendor's own prefix.

use std::collections::BTreeMap;

use crate::format::tiff::{TiffDump, TiffTag};

// =============================================================================
// Well-Known Property Names
// =============================================================================

/// Name of the vendor whose backend opened the slide.
pub const PROPERTY_VENDOR: &str = "wsi.vendor";

/// Content fingerprint of the slide, as lowercase hex.
pub const PROPERTY_QUICKHASH1: &str = "wsi.quickhash-1";

/// Objective power the slide was scanned at, when the vendor reports it.
pub const PROPERTY_OBJECTIVE_POWER: &str = "wsi.objective-power";

/// Microns per pixel along X at level 0.
pub const PROPERTY_MPP_X: &str = "wsi.mpp-x";

/// Microns per pixel along Y at level 0.
pub const PROPERTY_MPP_Y: &str = "wsi.mpp-y";

// =============================================================================
// Derived Properties
// =============================================================================

/// Copy `src` to `dst` when `src` parses as a whole integer.
///
/// The destination value is the canonical rendering of the parsed
/// integer, not the source text. Nothing is set when the source is
/// missing or malformed.
pub(crate) fn duplicate_int_prop(
    properties: &mut BTreeMap<String, String>,
    src: &str,
    dst: &str,
) {
    let Some(value) = properties.get(src) else {
        return;
    };
    if let Ok(parsed) = value.trim().parse::<i64>() {
        properties.insert(dst.to_string(), parsed.to_string());
    }
}

/// Copy `src` to `dst` when `src` parses as a finite float.
pub(crate) fn duplicate_double_prop(
    properties: &mut BTreeMap<String, String>,
    src: &str,
    dst: &str,
) {
    let Some(value) = properties.get(src) else {
        return;
    };
    if let Ok(parsed) = value.trim().parse::<f64>() {
        if parsed.is_finite() {
            properties.insert(dst.to_string(), parsed.to_string());
        }
    }
}

// =============================================================================
// Container Properties
// =============================================================================

const STRING_TAGS: [(TiffTag, &str); 9] = [
    (TiffTag::ImageDescription, "tiff.ImageDescription"),
    (TiffTag::Make, "tiff.Make"),
    (TiffTag::Model, "tiff.Model"),
    (TiffTag::Software, "tiff.Software"),
    (TiffTag::DateTime, "tiff.DateTime"),
    (TiffTag::Artist, "tiff.Artist"),
    (TiffTag::Copyright, "tiff.Copyright"),
    (TiffTag::DocumentName, "tiff.DocumentName"),
    (TiffTag::HostComputer, "tiff.HostComputer"),
];

fn resolution_unit_name(code: u64) -> &'static str {
    match code {
        1 => "none",
        2 => "inch",
        3 => "centimeter",
        _ => "unknown",
    }
}

/// Publish the standard metadata of directory 0 as `tiff.*` properties.
///
/// Every field is optional; unreadable values are simply skipped. The
/// resolution unit defaults to inches when the tag is absent, matching
/// the container specification's default.
pub(crate) fn add_tiff_properties(properties: &mut BTreeMap<String, String>, dump: &TiffDump) {
    for (tag, name) in STRING_TAGS {
        if let Ok(value) = dump.get_string(0, tag) {
            properties.insert(name.to_string(), value);
        }
    }

    if let Ok(value) = dump.get_f64(0, TiffTag::XResolution) {
        properties.insert("tiff.XResolution".to_string(), value.to_string());
    }
    if let Ok(value) = dump.get_f64(0, TiffTag::YResolution) {
        properties.insert("tiff.YResolution".to_string(), value.to_string());
    }

    let unit = if dump.has_tag(0, TiffTag::ResolutionUnit) {
        dump.get_u64(0, TiffTag::ResolutionUnit)
            .map(resolution_unit_name)
            .ok()
    } else {
        Some("inch")
    };
    if let Some(unit) = unit {
        properties.insert("tiff.ResolutionUnit".to_string(), unit.to_string());
    }
}

// =============================================================================
// Tests
// =============================================================================

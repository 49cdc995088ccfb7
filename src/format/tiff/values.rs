//! TIFF tag value decoding.
//!
//! This module interprets entry payloads that have already been fetched
//! from the file: integer coercion across the width-variant TIFF types,
//! and ASCII string extraction. Decoding is byte-order aware but does no
//! I/O of its own.

use super::parser::ByteOrder;
use super::tags::FieldType;

// =============================================================================
// Unsigned integer decoding
// =============================================================================

/// Decode one unsigned integer from an entry payload.
///
/// TIFF writers pick whichever integer width fits, so a logically-u32
/// field may be stored as BYTE, SHORT, LONG or LONG8. All unsigned widths
/// coerce to u64 here; callers narrow afterwards if they need to.
///
/// Returns `None` if the field type is not an unsigned integer type or
/// `index` is past the end of the payload.
pub(crate) fn unsigned_at(
    field_type: FieldType,
    order: ByteOrder,
    data: &[u8],
    index: usize,
) -> Option<u64> {
    let width = field_type.size_in_bytes();
    let start = index.checked_mul(width)?;
    let end = start.checked_add(width)?;
    if end > data.len() {
        return None;
    }

    let raw = &data[start..end];
    match field_type {
        FieldType::Byte => Some(raw[0] as u64),
        FieldType::Short => Some(order.read_u16(raw) as u64),
        FieldType::Long => Some(order.read_u32(raw) as u64),
        FieldType::Long8 | FieldType::Ifd8 => Some(order.read_u64(raw)),
        _ => None,
    }
}

/// Decode a whole payload of unsigned integers.
///
/// Returns `None` if the field type is not an unsigned integer type or
/// the payload is shorter than `count` values.
pub(crate) fn unsigned_array(
    field_type: FieldType,
    order: ByteOrder,
    data: &[u8],
    count: u64,
) -> Option<Vec<u64>> {
    let mut values = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        values.push(unsigned_at(field_type, order, data, i)?);
    }
    Some(values)
}

/// Whether a field type can be decoded by [`unsigned_at`].
pub(crate) fn is_unsigned_type(field_type: FieldType) -> bool {
    matches!(
        field_type,
        FieldType::Byte | FieldType::Short | FieldType::Long | FieldType::Long8 | FieldType::Ifd8
    )
}

// =============================================================================
// Floating point decoding
// =============================================================================

/// Decode one floating point value from an entry payload.
///
/// Covers FLOAT and DOUBLE plus the two rational pair types, which is what
/// resolution fields are stored as in practice. A rational with a zero
/// denominator decodes to `None`.
pub(crate) fn float_at(
    field_type: FieldType,
    order: ByteOrder,
    data: &[u8],
    index: usize,
) -> Option<f64> {
    let width = field_type.size_in_bytes();
    let start = index.checked_mul(width)?;
    let end = start.checked_add(width)?;
    if end > data.len() {
        return None;
    }

    let raw = &data[start..end];
    match field_type {
        FieldType::Float => Some(f32::from_bits(order.read_u32(raw)) as f64),
        FieldType::Double => Some(f64::from_bits(order.read_u64(raw))),
        FieldType::Rational => {
            let num = order.read_u32(&raw[0..4]) as f64;
            let den = order.read_u32(&raw[4..8]) as f64;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        FieldType::SRational => {
            let num = order.read_u32(&raw[0..4]) as i32 as f64;
            let den = order.read_u32(&raw[4..8]) as i32 as f64;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        _ => None,
    }
}

// =============================================================================
// ASCII string decoding
// =============================================================================

/// Decode an ASCII payload into a string.
///
/// TIFF ASCII fields are NUL-terminated; everything from the first NUL on
/// is dropped. Invalid UTF-8 bytes are replaced rather than rejected since
/// scanner metadata is not reliably clean.
pub(crate) fn ascii_string(data: &[u8]) -> String {
    let terminated = match data.iter().position(|&b| b == 0) {
        Some(nul) => &data[..nul],
        None => data,
    };
    String::from_utf8_lossy(terminated).into_owned()
}

// =============================================================================
// Tests
// =============================================================================

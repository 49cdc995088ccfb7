//! Whole-file TIFF directory summary.
//!
//! [`TiffDump`] walks the complete IFD chain once and materializes every
//! entry payload into memory. The result is a cheap, I/O-free view of the
//! container's structure: vendor detectors probe it, the pyramid builder
//! classifies directories from it, and the fingerprint reads tile extents
//! from it. Tile pixel data is never touched here; only directory entries
//! and their values are loaded.

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{RawEntry, TiffHeader, BIGTIFF_HEADER_SIZE, MAX_IFD_ENTRIES};
use super::tags::{FieldType, TiffTag};
use super::values;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs to walk. Slide files have tens of directories;
/// hundreds indicate corruption or a malicious chain.
const MAX_IFDS: usize = 100;

/// Cap on a single materialized entry payload. Large enough for the tile
/// offset arrays of gigapixel levels and multi-megabyte XML packets.
const MAX_VALUE_BYTES: u64 = 64 * 1024 * 1024;

// =============================================================================
// TiffEntry
// =============================================================================

/// One directory entry with its payload fully loaded.
#[derive(Debug, Clone)]
pub struct TiffEntry {
    pub(crate) field_type: FieldType,
    pub(crate) count: u64,
    pub(crate) data: Bytes,
}

impl TiffEntry {
    /// The entry's field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Number of values in the entry.
    pub fn count(&self) -> u64 {
        self.count
    }
}

// =============================================================================
// TiffDump
// =============================================================================

/// An in-memory summary of a TIFF file's directory structure.
///
/// Parsing reads the header, walks every IFD in the chain, and loads each
/// entry's value bytes. All accessors afterwards are synchronous. Integer
/// accessors coerce across the unsigned TIFF widths, so callers ask for
/// the width they need regardless of how the writer stored the field.
#[derive(Debug, Clone)]
pub struct TiffDump {
    header: TiffHeader,
    directories: Vec<TiffDirectory>,
}

/// Entries of one directory, keyed by tag in ascending order.
#[derive(Debug, Clone)]
struct TiffDirectory {
    entries: BTreeMap<u16, TiffEntry>,
}

impl TiffDump {
    /// Parse the full directory structure from a reader.
    ///
    /// # Errors
    /// Any structural problem is fatal: a malformed header, an IFD offset
    /// outside the file or revisited (chain loop), more than 100
    /// directories, an entry with an unknown field type, or a payload
    /// beyond the materialization cap. A file whose chain is empty yields
    /// `NoDirectories`.
    pub async fn parse(reader: &dyn RangeReader) -> Result<Self, TiffError> {
        let file_size = reader.size();
        let header_len = file_size.min(BIGTIFF_HEADER_SIZE as u64) as usize;
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, file_size)?;

        let mut directories = Vec::new();
        let mut visited = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 {
            if directories.len() >= MAX_IFDS {
                return Err(TiffError::TooManyDirectories(MAX_IFDS));
            }
            if offset % 2 != 0 || offset >= file_size {
                return Err(TiffError::InvalidIfdOffset(offset));
            }
            if !visited.insert(offset) {
                // Chain loops back on itself
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let directory_index = directories.len();
            let count_bytes = reader.read_exact_at(offset, header.ifd_count_size()).await?;
            let entry_count = header.parse_entry_count(&count_bytes);
            if entry_count > MAX_IFD_ENTRIES {
                return Err(TiffError::TooManyEntries {
                    directory: directory_index,
                    count: entry_count,
                });
            }

            let body_offset = offset + header.ifd_count_size() as u64;
            let body_len = header.directory_body_size(entry_count) as usize;
            let body = reader.read_exact_at(body_offset, body_len).await?;
            let raw = header.parse_directory_body(&body, entry_count, directory_index)?;

            let mut entries = BTreeMap::new();
            for raw_entry in &raw.entries {
                let entry = materialize(reader, &header, raw_entry).await?;
                entries.insert(raw_entry.tag, entry);
            }

            directories.push(TiffDirectory { entries });
            offset = raw.next_offset;
        }

        if directories.is_empty() {
            return Err(TiffError::NoDirectories);
        }

        debug!(
            identifier = reader.identifier(),
            directories = directories.len(),
            bigtiff = header.is_bigtiff,
            "parsed TIFF structure"
        );

        Ok(TiffDump {
            header,
            directories,
        })
    }

    /// Number of directories in the file.
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    /// Whether the directory stores its image as tiles.
    pub fn is_tiled(&self, directory: usize) -> bool {
        self.has_tag(directory, TiffTag::TileWidth) && self.has_tag(directory, TiffTag::TileLength)
    }

    /// Whether the directory carries the tag at all.
    pub fn has_tag(&self, directory: usize, tag: TiffTag) -> bool {
        self.entry(directory, tag).is_some()
    }

    /// Read a tag as u64, coercing from any unsigned integer width.
    pub fn get_u64(&self, directory: usize, tag: TiffTag) -> Result<u64, TiffError> {
        let entry = self.require(directory, tag)?;
        values::unsigned_at(entry.field_type, self.header.byte_order, &entry.data, 0).ok_or_else(
            || {
                self.bad_value(
                    directory,
                    tag,
                    format!("expected unsigned integer, found {:?}", entry.field_type),
                )
            },
        )
    }

    /// Read a tag as u32, coercing from any unsigned integer width.
    pub fn get_u32(&self, directory: usize, tag: TiffTag) -> Result<u32, TiffError> {
        let value = self.get_u64(directory, tag)?;
        u32::try_from(value)
            .map_err(|_| self.bad_value(directory, tag, format!("{value} exceeds u32 range")))
    }

    /// Read a whole unsigned integer array, coerced to u64.
    pub fn get_u64_array(&self, directory: usize, tag: TiffTag) -> Result<Vec<u64>, TiffError> {
        let entry = self.require(directory, tag)?;
        values::unsigned_array(
            entry.field_type,
            self.header.byte_order,
            &entry.data,
            entry.count,
        )
        .ok_or_else(|| {
            self.bad_value(
                directory,
                tag,
                format!(
                    "expected unsigned integer array, found {:?} x{}",
                    entry.field_type, entry.count
                ),
            )
        })
    }

    /// Read a tag as f64 from a float or rational field.
    pub fn get_f64(&self, directory: usize, tag: TiffTag) -> Result<f64, TiffError> {
        let entry = self.require(directory, tag)?;
        values::float_at(entry.field_type, self.header.byte_order, &entry.data, 0).ok_or_else(
            || {
                self.bad_value(
                    directory,
                    tag,
                    format!("expected float or rational, found {:?}", entry.field_type),
                )
            },
        )
    }

    /// Read an ASCII tag as a string, dropping the NUL terminator.
    pub fn get_string(&self, directory: usize, tag: TiffTag) -> Result<String, TiffError> {
        let entry = self.require(directory, tag)?;
        if entry.field_type != FieldType::Ascii {
            return Err(self.bad_value(
                directory,
                tag,
                format!("expected ASCII, found {:?}", entry.field_type),
            ));
        }
        Ok(values::ascii_string(&entry.data))
    }

    /// Read a tag's raw payload bytes. Accepts the byte-like field types
    /// (BYTE, UNDEFINED, ASCII), which is how embedded XML packets are
    /// stored.
    pub fn get_buffer(&self, directory: usize, tag: TiffTag) -> Result<Bytes, TiffError> {
        let entry = self.require(directory, tag)?;
        match entry.field_type {
            FieldType::Byte | FieldType::Undefined | FieldType::Ascii => Ok(entry.data.clone()),
            other => Err(self.bad_value(
                directory,
                tag,
                format!("expected byte buffer, found {other:?}"),
            )),
        }
    }

    fn entry(&self, directory: usize, tag: TiffTag) -> Option<&TiffEntry> {
        self.directories
            .get(directory)?
            .entries
            .get(&tag.as_u16())
    }

    fn require(&self, directory: usize, tag: TiffTag) -> Result<&TiffEntry, TiffError> {
        self.entry(directory, tag).ok_or(TiffError::MissingTag {
            directory,
            tag: tag.as_u16(),
        })
    }

    fn bad_value(&self, directory: usize, tag: TiffTag, message: String) -> TiffError {
        TiffError::InvalidTagValue {
            directory,
            tag: tag.as_u16(),
            message,
        }
    }
}

/// Load one entry's payload, inline or from its file offset.
async fn materialize(
    reader: &dyn RangeReader,
    header: &TiffHeader,
    raw: &RawEntry,
) -> Result<TiffEntry, TiffError> {
    let field_type = FieldType::from_u16(raw.field_type_code)
        .ok_or(TiffError::UnknownFieldType(raw.field_type_code))?;

    let payload_len = raw
        .count
        .checked_mul(field_type.size_in_bytes() as u64)
        .ok_or(TiffError::ValueTooLarge {
            tag: raw.tag,
            bytes: u64::MAX,
        })?;
    if payload_len > MAX_VALUE_BYTES {
        return Err(TiffError::ValueTooLarge {
            tag: raw.tag,
            bytes: payload_len,
        });
    }

    let data = if payload_len as usize <= header.value_offset_size() {
        Bytes::copy_from_slice(&raw.value_word[..payload_len as usize])
    } else {
        let value_offset = if header.is_bigtiff {
            header.byte_order.read_u64(&raw.value_word)
        } else {
            header.byte_order.read_u32(&raw.value_word[..4]) as u64
        };
        reader.read_exact_at(value_offset, payload_len as usize).await?
    };

    Ok(TiffEntry {
        field_type,
        count: raw.count,
        data,
    })
}

// =============================================================================
// Tests
// =============================================================================

//! TIFF header and directory structure parsing.
//!
//! This module decodes the byte-level layout of TIFF and BigTIFF files:
//! the file header, and the entry tables that make up each image file
//! directory (IFD). Everything here is synchronous and operates on byte
//! slices; fetching those bytes is the caller's concern.
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (43 = 0x002B)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```

use crate::error::TiffError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Upper bound on entries per directory. Classic TIFF caps the count at
/// u16::MAX; a BigTIFF directory declaring more than this is corrupt.
pub const MAX_IFD_ENTRIES: u64 = 65_536;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// Declared by the first two bytes of the header and applied to every
/// multi-byte value read from the file afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
///
/// Carries what directory parsing needs: the byte order, whether the file
/// uses BigTIFF layout (which widens counts and offsets), and where the
/// first IFD lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw header bytes (at least 8, or 16 for BigTIFF)
    /// * `file_size` - Total file size, used to validate the first IFD offset
    ///
    /// # Errors
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    /// - `InvalidBigTiffOffsetSize` if BigTIFF offset size is not 8
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidIfdOffset` if the first IFD offset is outside the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // The byte-order mark itself is order-independent: "II" or "MM".
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        match version {
            VERSION_TIFF => Self::parse_classic(byte_order, bytes, file_size),
            VERSION_BIGTIFF => Self::parse_bigtiff(byte_order, bytes, file_size),
            _ => Err(TiffError::InvalidVersion(version)),
        }
    }

    fn parse_classic(
        byte_order: ByteOrder,
        bytes: &[u8],
        file_size: u64,
    ) -> Result<Self, TiffError> {
        let first_ifd_offset = byte_order.read_u32(&bytes[4..8]) as u64;
        Self::check_first_offset(first_ifd_offset, file_size)?;

        Ok(TiffHeader {
            byte_order,
            is_bigtiff: false,
            first_ifd_offset,
        })
    }

    fn parse_bigtiff(
        byte_order: ByteOrder,
        bytes: &[u8],
        file_size: u64,
    ) -> Result<Self, TiffError> {
        if bytes.len() < BIGTIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: BIGTIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let offset_size = byte_order.read_u16(&bytes[4..6]);
        if offset_size != 8 {
            return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
        }

        // Bytes 6-7 are reserved; tolerated regardless of content.
        let first_ifd_offset = byte_order.read_u64(&bytes[8..16]);
        Self::check_first_offset(first_ifd_offset, file_size)?;

        Ok(TiffHeader {
            byte_order,
            is_bigtiff: true,
            first_ifd_offset,
        })
    }

    fn check_first_offset(offset: u64, file_size: u64) -> Result<(), TiffError> {
        // The TIFF spec requires word-aligned directory offsets.
        if offset >= file_size || offset % 2 != 0 {
            return Err(TiffError::InvalidIfdOffset(offset));
        }
        Ok(())
    }

    /// Size of an IFD entry in bytes.
    ///
    /// Classic TIFF: 12 bytes (2 tag + 2 type + 4 count + 4 value/offset)
    /// BigTIFF: 20 bytes (2 tag + 2 type + 8 count + 8 value/offset)
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD.
    ///
    /// Classic TIFF: 2 bytes (u16)
    /// BigTIFF: 8 bytes (u64)
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the next IFD offset field at the end of an IFD.
    ///
    /// Classic TIFF: 4 bytes (u32)
    /// BigTIFF: 8 bytes (u64)
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of the value/offset field in an IFD entry.
    ///
    /// Values no larger than this are stored inline in the entry itself;
    /// anything bigger is stored elsewhere and the field holds its offset.
    ///
    /// Classic TIFF: 4 bytes
    /// BigTIFF: 8 bytes
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Parse the entry count field at the start of a directory.
    pub(crate) fn parse_entry_count(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u16(bytes) as u64
        }
    }

    /// Number of bytes a directory body occupies after its count field:
    /// the entry table plus the trailing next-IFD offset.
    pub(crate) fn directory_body_size(&self, entry_count: u64) -> u64 {
        entry_count * self.ifd_entry_size() as u64 + self.ifd_next_offset_size() as u64
    }

    /// Parse a directory body: the entry table and the next-IFD offset.
    ///
    /// `bytes` must hold the full body as sized by [`directory_body_size`].
    /// Entries are decoded structurally only; tag payloads stay unresolved
    /// until the caller fetches them.
    ///
    /// [`directory_body_size`]: TiffHeader::directory_body_size
    pub(crate) fn parse_directory_body(
        &self,
        bytes: &[u8],
        entry_count: u64,
        directory: usize,
    ) -> Result<RawDirectory, TiffError> {
        if entry_count > MAX_IFD_ENTRIES {
            return Err(TiffError::TooManyEntries {
                directory,
                count: entry_count,
            });
        }

        let required = self.directory_body_size(entry_count);
        if (bytes.len() as u64) < required {
            return Err(TiffError::FileTooSmall {
                required,
                actual: bytes.len() as u64,
            });
        }

        let entry_size = self.ifd_entry_size();
        let value_size = self.value_offset_size();
        let mut entries = Vec::with_capacity(entry_count as usize);

        for i in 0..entry_count as usize {
            let entry = &bytes[i * entry_size..(i + 1) * entry_size];

            let tag = self.byte_order.read_u16(&entry[0..2]);
            let field_type_code = self.byte_order.read_u16(&entry[2..4]);
            let (count, value_start) = if self.is_bigtiff {
                (self.byte_order.read_u64(&entry[4..12]), 12)
            } else {
                (self.byte_order.read_u32(&entry[4..8]) as u64, 8)
            };

            // Keep the raw value/offset field as-is; whether it holds the
            // value inline or an offset depends on the payload size.
            let mut value_word = [0u8; 8];
            value_word[..value_size].copy_from_slice(&entry[value_start..value_start + value_size]);

            entries.push(RawEntry {
                tag,
                field_type_code,
                count,
                value_word,
            });
        }

        let next_start = entry_count as usize * entry_size;
        let next_offset = if self.is_bigtiff {
            self.byte_order
                .read_u64(&bytes[next_start..next_start + 8])
        } else {
            self.byte_order
                .read_u32(&bytes[next_start..next_start + 4]) as u64
        };

        Ok(RawDirectory {
            entries,
            next_offset,
        })
    }
}

// =============================================================================
// Raw directory structures
// =============================================================================

/// One IFD entry as it appears on disk, before payload resolution.
#[derive(Debug, Clone)]
pub(crate) struct RawEntry {
    /// Tag ID
    pub tag: u16,

    /// Field type code, not yet validated against known types
    pub field_type_code: u16,

    /// Number of values of the field type
    pub count: u64,

    /// The raw value/offset field. Only the first `value_offset_size()`
    /// bytes are meaningful; the rest are zero for classic TIFF.
    pub value_word: [u8; 8],
}

/// One parsed directory: its entry table and the link to the next IFD.
#[derive(Debug, Clone)]
pub(crate) struct RawDirectory {
    /// Entries in file order
    pub entries: Vec<RawEntry>,

    /// Offset of the next IFD, or 0 at the end of the chain
    pub next_offset: u64,
}

// =============================================================================
// Tests
// =============================================================================

//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for container parsing:
//! - Field types that determine how entry payloads are encoded
//! - Tag IDs for the fields the slide reader consumes
//! - Compression scheme identifiers and the supported subset
//!
//! The definitions cover both classic TIFF and BigTIFF.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how entry payloads are encoded.
///
/// The full type set is supported because the directory summary
/// materializes every entry it encounters, including fields this crate
/// never interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,

    /// 8-bit ASCII character
    Ascii = 2,

    /// Unsigned 16-bit integer
    Short = 3,

    /// Unsigned 32-bit integer
    Long = 4,

    /// Two LONGs: numerator, denominator
    Rational = 5,

    /// Signed 8-bit integer
    SByte = 6,

    /// Undefined byte data
    Undefined = 7,

    /// Signed 16-bit integer
    SShort = 8,

    /// Signed 32-bit integer
    SLong = 9,

    /// Two SLONGs: numerator, denominator
    SRational = 10,

    /// 32-bit IEEE float
    Float = 11,

    /// 64-bit IEEE float
    Double = 12,

    /// Unsigned 64-bit integer (BigTIFF)
    Long8 = 16,

    /// Signed 64-bit integer (BigTIFF)
    SLong8 = 17,

    /// 64-bit IFD offset (BigTIFF)
    Ifd8 = 18,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type codes.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs the slide reader consumes.
///
/// Tags are 16-bit identifiers for directory fields. Only the tags listed
/// here are interpreted; everything else is carried as opaque entry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Directory classification
    // -------------------------------------------------------------------------
    /// Subfile type bit flags; bit 0 marks a reduced-resolution image
    NewSubfileType = 254,

    // -------------------------------------------------------------------------
    // Basic image structure
    // -------------------------------------------------------------------------
    /// Image width in pixels
    ImageWidth = 256,

    /// Image height (length) in pixels
    ImageLength = 257,

    /// Compression scheme used
    Compression = 259,

    /// Description string; names embedded associated images
    ImageDescription = 270,

    /// Scanner manufacturer
    Make = 271,

    /// Scanner model
    Model = 272,

    /// Software that produced the file
    Software = 305,

    /// Creation date/time
    DateTime = 306,

    /// Person who created the image
    Artist = 315,

    /// Computer that created the image
    HostComputer = 316,

    /// Document name
    DocumentName = 269,

    /// Copyright notice
    Copyright = 33432,

    /// Pixels per resolution unit, horizontal
    XResolution = 282,

    /// Pixels per resolution unit, vertical
    YResolution = 283,

    /// Unit for the resolution fields (none/inch/centimeter)
    ResolutionUnit = 296,

    // -------------------------------------------------------------------------
    // Tile organization
    // -------------------------------------------------------------------------
    /// Width of each tile in pixels
    TileWidth = 322,

    /// Height (length) of each tile in pixels
    TileLength = 323,

    /// Byte offsets of each tile in the file
    TileOffsets = 324,

    /// Byte counts of each tile
    TileByteCounts = 325,

    // -------------------------------------------------------------------------
    // Codec data and vendor metadata
    // -------------------------------------------------------------------------
    /// JPEG quantization and Huffman tables for abbreviated tile streams
    JpegTables = 347,

    /// Embedded XML metadata packet (XMP); carries the vendor ScanInfo document
    XmlPacket = 700,
}

impl TiffTag {
    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

/// NewSubfileType bit 0: the directory holds a reduced-resolution version
/// of another image in the file.
pub const SUBFILE_REDUCED_IMAGE: u64 = 0x1;

// =============================================================================
// Compression Values
// =============================================================================

/// TIFF compression scheme identifiers.
///
/// The decoder handles JPEG and the two JPEG 2000 variants used by slide
/// scanners. Every other scheme is rejected when the pyramid is built: an
/// undecodable level would make the whole slide unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    /// No compression
    None = 1,

    /// LZW compression
    Lzw = 5,

    /// "Old-style" JPEG (rarely seen, never supported)
    OldJpeg = 6,

    /// JPEG compression (supported)
    Jpeg = 7,

    /// Deflate/zlib compression
    Deflate = 8,

    /// PackBits run-length encoding
    PackBits = 32773,

    /// Adobe Deflate
    AdobeDeflate = 32946,

    /// JPEG 2000 with YCbCr colorspace (supported)
    Jpeg2000Ycbcr = 33003,

    /// JPEG 2000 with RGB colorspace (supported)
    Jpeg2000Rgb = 33005,
}

impl Compression {
    /// Create a Compression from its numeric value.
    ///
    /// Returns `None` for unrecognized compression codes.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32773 => Some(Compression::PackBits),
            32946 => Some(Compression::AdobeDeflate),
            33003 => Some(Compression::Jpeg2000Ycbcr),
            33005 => Some(Compression::Jpeg2000Rgb),
            _ => None,
        }
    }

    /// Check if the tile decoder can handle this compression scheme.
    #[inline]
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Compression::Jpeg | Compression::Jpeg2000Ycbcr | Compression::Jpeg2000Rgb
        )
    }

    /// Get the numeric compression code.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Get a human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::PackBits => "PackBits",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::Jpeg2000Ycbcr => "JPEG 2000 (YCbCr)",
            Compression::Jpeg2000Rgb => "JPEG 2000 (RGB)",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

use thiserror::Error;

/// I/O errors that can occur when reading from the slide file
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the underlying file
    #[error("File error: {0}")]
    File(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Errors that can occur when parsing the container structure
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// The IFD chain loops or exceeds the directory limit
    #[error("Too many IFDs: more than {0} directories")]
    TooManyDirectories(usize),

    /// A single directory declares an implausible entry count
    #[error("Directory {directory} declares {count} entries")]
    TooManyEntries { directory: usize, count: u64 },

    /// The file contains no directories at all
    #[error("No directories in file")]
    NoDirectories,

    /// Required tag is missing from a directory
    #[error("Missing tag {tag} in directory {directory}")]
    MissingTag { directory: usize, tag: u16 },

    /// Tag has unexpected type, count, or content
    #[error("Invalid value for tag {tag} in directory {directory}: {message}")]
    InvalidTagValue {
        directory: usize,
        tag: u16,
        message: String,
    },

    /// Tag value payload exceeds the materialization limit
    #[error("Value for tag {tag} too large: {bytes} bytes")]
    ValueTooLarge { tag: u16, bytes: u64 },

    /// Unknown field type in an IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Soft rejection from a vendor format detector.
///
/// Detection failures are not fatal: the caller simply tries the next
/// registered backend. A file rejected by every backend surfaces as
/// [`OpenError::FormatNotRecognized`].
#[derive(Debug, Clone, Error)]
pub enum DetectError {
    /// The file is not an instance of this backend's format
    #[error("Format not recognized: {reason}")]
    NotRecognized { reason: String },
}

impl DetectError {
    /// Builds the standard rejection with a human-readable reason.
    pub fn not_recognized(reason: impl Into<String>) -> Self {
        Self::NotRecognized {
            reason: reason.into(),
        }
    }
}

/// Hard failures while building a slide.
///
/// Any of these aborts the build; no partially constructed slide state
/// survives the error.
#[derive(Debug, Clone, Error)]
pub enum OpenError {
    /// I/O error while opening the file or checking out a decoder
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// No registered backend recognized the file
    #[error("Format not recognized by any registered backend")]
    FormatNotRecognized,

    /// The container's first directory is not tile-organized
    #[error("Not a tiled container")]
    NotATiledContainer,

    /// The embedded XML metadata packet is absent or does not parse
    #[error("Missing or unparsable XML metadata: {reason}")]
    MissingOrUnparsableXml { reason: String },

    /// A required directory field could not be read
    #[error("Cannot read {field} in directory {directory}: {source}")]
    FieldRead {
        directory: usize,
        field: &'static str,
        source: TiffError,
    },

    /// A directory uses a compression scheme the decoder cannot handle
    #[error("Unsupported compression {code} in directory {directory}")]
    UnsupportedCompression { directory: usize, code: u16 },

    /// An embedded associated image could not be registered
    #[error("Cannot register associated image {name:?} from directory {directory}: {source}")]
    AssociatedImageRegistration {
        name: String,
        directory: usize,
        source: TiffError,
    },

    /// The thumbnail directory could not be registered
    #[error("Cannot register thumbnail from directory {directory}: {source}")]
    ThumbnailRegistration { directory: usize, source: TiffError },

    /// The content fingerprint could not be computed
    #[error("Cannot compute content fingerprint: {source}")]
    Fingerprint { source: TiffError },
}

/// Errors that can occur while decoding or painting tiles
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// I/O error while reading tile data
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Requested pyramid level does not exist
    #[error("Invalid level {level}: slide has {level_count} levels")]
    InvalidLevel { level: usize, level_count: usize },

    /// The directory has no data for this tile position
    #[error("No tile data at ({col}, {row}) in directory {directory}")]
    MissingTile { directory: usize, col: u32, row: u32 },

    /// Tile payload could not be decoded to pixels
    #[error("Cannot decode tile ({col}, {row}): {reason}")]
    Decode { col: u32, row: u32, reason: String },

    /// No decoder exists for the compression scheme
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(u16),

    /// Named associated image does not exist on this slide
    #[error("No associated image named {0:?}")]
    NoSuchAssociatedImage(String),
}

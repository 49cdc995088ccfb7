//! TIFF container parsing for whole slide images.
//!
//! Slide scanners ship their pyramids inside TIFF or BigTIFF containers,
//! one image file directory (IFD) per resolution or embedded image. This
//! module parses that structure into a [`TiffDump`]: a fully materialized,
//! I/O-free summary that detectors and the pyramid builder query by tag.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. All multi-byte values are read
//!   respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB
//!   files), while BigTIFF uses 64-bit offsets. Both are handled
//!   transparently.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD
//!   entry, larger values at an offset pointed to by the entry. After
//!   parsing, the distinction is gone; every entry holds its payload.

mod dump;
mod parser;
mod tags;
mod values;

pub use dump::{TiffDump, TiffEntry};
pub use parser::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{Compression, FieldType, TiffTag, SUBFILE_REDUCED_IMAGE};

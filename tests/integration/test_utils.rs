//! Shared fixtures for the integration tests.
//!
//! Everything here builds complete synthetic slide containers in memory:
//! classic little-endian TIFFs with chained directories, real JPEG tile
//! payloads, and an embedded ScanInfo XML packet, shaped like the files
//! the scanner writes. The builder assembles the file in three passes so
//! tile offset tables can point at data that is laid out after the
//! directory chain.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use wsi_reader::{Canvas, DetectError, IoError, OpenError, OpenOptions, RangeReader, Slide};

// =============================================================================
// Tag and compression constants
// =============================================================================

pub const TAG_NEW_SUBFILE_TYPE: u16 = 254;
pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_LENGTH: u16 = 257;
pub const TAG_COMPRESSION: u16 = 259;
pub const TAG_IMAGE_DESCRIPTION: u16 = 270;
pub const TAG_MAKE: u16 = 271;
pub const TAG_STRIP_OFFSETS: u16 = 273;
pub const TAG_ROWS_PER_STRIP: u16 = 278;
pub const TAG_STRIP_BYTE_COUNTS: u16 = 279;
pub const TAG_X_RESOLUTION: u16 = 282;
pub const TAG_Y_RESOLUTION: u16 = 283;
pub const TAG_RESOLUTION_UNIT: u16 = 296;
pub const TAG_SOFTWARE: u16 = 305;
pub const TAG_DATE_TIME: u16 = 306;
pub const TAG_TILE_WIDTH: u16 = 322;
pub const TAG_TILE_LENGTH: u16 = 323;
pub const TAG_TILE_OFFSETS: u16 = 324;
pub const TAG_TILE_BYTE_COUNTS: u16 = 325;
pub const TAG_XML_PACKET: u16 = 700;

pub const COMPRESSION_JPEG: u16 = 7;
pub const COMPRESSION_LZW: u16 = 5;

const FIELD_ASCII: u16 = 2;
const FIELD_SHORT: u16 = 3;
const FIELD_LONG: u16 = 4;
const FIELD_RATIONAL: u16 = 5;
const FIELD_UNDEFINED: u16 = 7;

/// ScanInfo packet carried by every well-formed fixture. `SlideBarcode`
/// is empty to mirror scanners that write the attribute without a value.
pub const SCAN_INFO_XML: &str = r#"<ScanInfo Magnification="20" PixelResolution="0.5" ScannerModel="OS-Ultra" ScanDate="2022-03-01" SlideId="A-113" SlideBarcode=""/>"#;

// Solid tile colors used across the fixtures
pub const BASE_RGB: [u8; 3] = [200, 30, 40];
pub const MID_RGB: [u8; 3] = [30, 40, 200];
pub const SMALL_RGB: [u8; 3] = [20, 160, 160];
pub const LABEL_RGB: [u8; 3] = [20, 180, 40];
pub const MACRO_RGB: [u8; 3] = [220, 210, 40];
pub const RED_RGB: [u8; 3] = [200, 30, 40];
pub const GREEN_RGB: [u8; 3] = [20, 180, 40];
pub const GRAY_RGB: [u8; 3] = [128, 128, 128];

// =============================================================================
// JPEG tile payloads
// =============================================================================

/// Encode a solid-color JPEG of the given dimensions.
pub fn jpeg_tile(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, 90);
    encoder.encode_image(&img).unwrap();
    out
}

// =============================================================================
// TIFF builder
// =============================================================================

enum Value {
    /// Payload packed into the 4-byte value field
    Inline([u8; 4]),
    /// Payload placed after the directory chain, offset patched in
    External(Vec<u8>),
}

struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    value: Value,
}

/// Values of four bytes or fewer go inline; anything larger is stored in
/// the data region behind the directory chain.
fn entry(tag: u16, field_type: u16, count: u32, payload: Vec<u8>) -> Entry {
    if payload.len() <= 4 {
        let mut word = [0u8; 4];
        word[..payload.len()].copy_from_slice(&payload);
        Entry {
            tag,
            field_type,
            count,
            value: Value::Inline(word),
        }
    } else {
        Entry {
            tag,
            field_type,
            count,
            value: Value::External(payload),
        }
    }
}

fn long_array_payload(items: &[u32]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(items.len() * 4);
    for item in items {
        payload.extend_from_slice(&item.to_le_bytes());
    }
    payload
}

/// One image file directory under construction.
///
/// Tile (or strip) payloads are handed over as raw byte blobs; the offset
/// and byte-count tables are generated when the file is assembled. An
/// empty blob produces a sparse slot with offset and count zero.
pub struct DirectoryBuilder {
    entries: Vec<Entry>,
    blobs: Vec<Vec<u8>>,
    offsets_tag: u16,
    counts_tag: u16,
    tile_slots: u32,
}

impl DirectoryBuilder {
    /// Start a tile-organized directory. Tile data comes later via
    /// [`tiles`](Self::tiles) or [`shared_tile`](Self::shared_tile).
    pub fn tiled(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        compression: u16,
    ) -> Self {
        let across = width.div_ceil(tile_width);
        let down = height.div_ceil(tile_height);
        Self {
            entries: Vec::new(),
            blobs: Vec::new(),
            offsets_tag: TAG_TILE_OFFSETS,
            counts_tag: TAG_TILE_BYTE_COUNTS,
            tile_slots: across * down,
        }
        .long(TAG_IMAGE_WIDTH, width)
        .long(TAG_IMAGE_LENGTH, height)
        .short(TAG_COMPRESSION, compression)
        .short(TAG_TILE_WIDTH, tile_width as u16)
        .short(TAG_TILE_LENGTH, tile_height as u16)
    }

    /// Start a strip-organized directory holding one strip of raw data.
    pub fn stripped(width: u32, height: u32, strip: Vec<u8>) -> Self {
        Self {
            entries: Vec::new(),
            blobs: vec![strip],
            offsets_tag: TAG_STRIP_OFFSETS,
            counts_tag: TAG_STRIP_BYTE_COUNTS,
            tile_slots: 1,
        }
        .long(TAG_IMAGE_WIDTH, width)
        .long(TAG_IMAGE_LENGTH, height)
        .short(TAG_COMPRESSION, 1)
        .long(TAG_ROWS_PER_STRIP, height)
    }

    /// One blob per tile slot, row-major. An empty blob marks a sparse
    /// tile.
    pub fn tiles(mut self, blobs: Vec<Vec<u8>>) -> Self {
        assert_eq!(
            blobs.len(),
            self.tile_slots as usize,
            "blob count does not match the tile grid"
        );
        self.blobs = blobs;
        self
    }

    /// Fill every tile slot with copies of one blob.
    pub fn shared_tile(self, blob: Vec<u8>) -> Self {
        let slots = self.tile_slots as usize;
        self.tiles(vec![blob; slots])
    }

    pub fn short(mut self, tag: u16, value: u16) -> Self {
        self.entries
            .push(entry(tag, FIELD_SHORT, 1, value.to_le_bytes().to_vec()));
        self
    }

    pub fn long(mut self, tag: u16, value: u32) -> Self {
        self.entries
            .push(entry(tag, FIELD_LONG, 1, value.to_le_bytes().to_vec()));
        self
    }

    pub fn ascii(mut self, tag: u16, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        let count = payload.len() as u32;
        self.entries.push(entry(tag, FIELD_ASCII, count, payload));
        self
    }

    pub fn rational(mut self, tag: u16, numerator: u32, denominator: u32) -> Self {
        let mut payload = numerator.to_le_bytes().to_vec();
        payload.extend_from_slice(&denominator.to_le_bytes());
        self.entries.push(entry(tag, FIELD_RATIONAL, 1, payload));
        self
    }

    pub fn undefined(mut self, tag: u16, payload: &[u8]) -> Self {
        self.entries.push(entry(
            tag,
            FIELD_UNDEFINED,
            payload.len() as u32,
            payload.to_vec(),
        ));
        self
    }

    pub fn subfile_type(self, value: u32) -> Self {
        self.long(TAG_NEW_SUBFILE_TYPE, value)
    }

    pub fn description(self, text: &str) -> Self {
        self.ascii(TAG_IMAGE_DESCRIPTION, text)
    }

    pub fn xml_packet(self, xml: &str) -> Self {
        self.undefined(TAG_XML_PACKET, xml.as_bytes())
    }
}

/// Assemble a classic little-endian TIFF from a directory chain.
pub fn build_tiff(directories: Vec<DirectoryBuilder>) -> Vec<u8> {
    // Pass 1: directory offsets. Entry counts are final here because each
    // directory with blobs gains exactly its offsets and counts tables.
    let mut dir_offsets = Vec::new();
    let mut cursor = 8u32;
    for dir in &directories {
        let entry_count = dir.entries.len() + if dir.blobs.is_empty() { 0 } else { 2 };
        dir_offsets.push(cursor);
        cursor += 2 + entry_count as u32 * 12 + 4;
    }
    let data_start = cursor;

    // Pass 2: place tile data in the data region and derive the offset
    // and byte-count tables from where each blob landed.
    let mut data_section: Vec<u8> = Vec::new();
    let mut finalized: Vec<Vec<Entry>> = Vec::new();
    for dir in directories {
        let mut entries = dir.entries;
        if !dir.blobs.is_empty() {
            let mut offsets = Vec::with_capacity(dir.blobs.len());
            let mut counts = Vec::with_capacity(dir.blobs.len());
            for blob in &dir.blobs {
                if blob.is_empty() {
                    // Sparse slot: nothing was written for this tile
                    offsets.push(0);
                    counts.push(0);
                    continue;
                }
                if data_section.len() % 2 == 1 {
                    data_section.push(0);
                }
                offsets.push(data_start + data_section.len() as u32);
                counts.push(blob.len() as u32);
                data_section.extend_from_slice(blob);
            }
            entries.push(entry(
                dir.offsets_tag,
                FIELD_LONG,
                offsets.len() as u32,
                long_array_payload(&offsets),
            ));
            entries.push(entry(
                dir.counts_tag,
                FIELD_LONG,
                counts.len() as u32,
                long_array_payload(&counts),
            ));
        }
        entries.sort_by_key(|e| e.tag);
        finalized.push(entries);
    }

    // Pass 3: emit the header, the directory chain, then the data region
    let mut out = vec![0x49, 0x49, 0x2A, 0x00];
    out.extend_from_slice(&dir_offsets.first().copied().unwrap_or(0).to_le_bytes());
    for (i, entries) in finalized.iter().enumerate() {
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for e in entries {
            out.extend_from_slice(&e.tag.to_le_bytes());
            out.extend_from_slice(&e.field_type.to_le_bytes());
            out.extend_from_slice(&e.count.to_le_bytes());
            match &e.value {
                Value::Inline(word) => out.extend_from_slice(word),
                Value::External(payload) => {
                    if data_section.len() % 2 == 1 {
                        data_section.push(0);
                    }
                    let offset = data_start + data_section.len() as u32;
                    out.extend_from_slice(&offset.to_le_bytes());
                    data_section.extend_from_slice(payload);
                }
            }
        }
        let next = if i + 1 < finalized.len() {
            dir_offsets[i + 1]
        } else {
            0
        };
        out.extend_from_slice(&next.to_le_bytes());
    }
    out.extend_from_slice(&data_section);
    out
}

// =============================================================================
// Canned fixtures
// =============================================================================

/// A full slide the way the scanner writes it:
///
/// | dir | content                              | classification        |
/// |-----|--------------------------------------|-----------------------|
/// | 0   | 2048x1536 base scan, ScanInfo packet | level 0               |
/// | 1   | 400x300 page named "label"           | associated image      |
/// | 2   | 1024x768 reduced image               | level 1 and thumbnail |
/// | 3   | 600x400 page named "macro"           | associated image      |
/// | 4   | 512x384 reduced image                | level 2               |
/// | 5   | 64x64 strip-organized page           | skipped               |
///
/// Directory 2 is the last reduced image over 500x500, so it doubles as
/// the "thumbnail" associated image. Directory 4 is wide enough but not
/// tall enough to displace it.
pub fn create_standard_slide() -> Vec<u8> {
    build_tiff(vec![
        DirectoryBuilder::tiled(2048, 1536, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .xml_packet(SCAN_INFO_XML)
            .ascii(TAG_MAKE, "OptraSCAN OS-Ultra")
            .ascii(TAG_SOFTWARE, "OptraScan Acquire 2.1.0")
            .ascii(TAG_DATE_TIME, "2022:03:01 09:15:22")
            .rational(TAG_X_RESOLUTION, 2000, 1)
            .rational(TAG_Y_RESOLUTION, 2000, 1)
            .short(TAG_RESOLUTION_UNIT, 3)
            .shared_tile(jpeg_tile(256, 256, BASE_RGB)),
        DirectoryBuilder::tiled(400, 300, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .description("label")
            .shared_tile(jpeg_tile(256, 256, LABEL_RGB)),
        DirectoryBuilder::tiled(1024, 768, 256, 256, COMPRESSION_JPEG)
            .subfile_type(1)
            .shared_tile(jpeg_tile(256, 256, MID_RGB)),
        DirectoryBuilder::tiled(600, 400, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .description("macro")
            .shared_tile(jpeg_tile(256, 256, MACRO_RGB)),
        DirectoryBuilder::tiled(512, 384, 256, 256, COMPRESSION_JPEG)
            .subfile_type(1)
            .shared_tile(jpeg_tile(256, 256, SMALL_RGB)),
        DirectoryBuilder::stripped(64, 64, vec![0u8; 100]),
    ])
}

/// Single-level slide: one tiled base directory with the ScanInfo packet
/// and nothing else. No reduced image qualifies as thumbnail, so
/// directory 0 stands in.
pub fn create_minimal_slide() -> Vec<u8> {
    build_tiff(vec![DirectoryBuilder::tiled(
        512,
        512,
        256,
        256,
        COMPRESSION_JPEG,
    )
    .subfile_type(0)
    .xml_packet(SCAN_INFO_XML)
    .shared_tile(jpeg_tile(256, 256, BASE_RGB))])
}

/// One 512x256 level of two tiles: red on the left, green on the right.
pub fn create_split_level_slide() -> Vec<u8> {
    build_tiff(vec![DirectoryBuilder::tiled(
        512,
        256,
        256,
        256,
        COMPRESSION_JPEG,
    )
    .subfile_type(0)
    .xml_packet(SCAN_INFO_XML)
    .tiles(vec![
        jpeg_tile(256, 256, RED_RGB),
        jpeg_tile(256, 256, GREEN_RGB),
    ])])
}

/// Like [`create_split_level_slide`], but the right tile was never
/// written: its offset and byte count are zero.
pub fn create_sparse_slide() -> Vec<u8> {
    build_tiff(vec![DirectoryBuilder::tiled(
        512,
        256,
        256,
        256,
        COMPRESSION_JPEG,
    )
    .subfile_type(0)
    .xml_packet(SCAN_INFO_XML)
    .tiles(vec![jpeg_tile(256, 256, RED_RGB), Vec::new()])])
}

/// Two-level pyramid with distinguishable tiles on the reduced level:
/// a gray 1024x256 base and a 512x128 level whose left tile is red and
/// right tile is green.
pub fn create_pyramid_slide() -> Vec<u8> {
    build_tiff(vec![
        DirectoryBuilder::tiled(1024, 256, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .xml_packet(SCAN_INFO_XML)
            .shared_tile(jpeg_tile(256, 256, GRAY_RGB)),
        DirectoryBuilder::tiled(512, 128, 256, 256, COMPRESSION_JPEG)
            .subfile_type(1)
            .tiles(vec![
                jpeg_tile(256, 256, RED_RGB),
                jpeg_tile(256, 256, GREEN_RGB),
            ]),
    ])
}

/// Strip-organized first directory; the packet is present but the file
/// is not tile-organized.
pub fn create_untiled_slide() -> Vec<u8> {
    build_tiff(vec![
        DirectoryBuilder::stripped(512, 512, vec![0u8; 256]).xml_packet(SCAN_INFO_XML)
    ])
}

/// Tiled base directory without any XMLPacket tag.
pub fn create_slide_without_xml() -> Vec<u8> {
    build_tiff(vec![DirectoryBuilder::tiled(
        512,
        512,
        256,
        256,
        COMPRESSION_JPEG,
    )
    .subfile_type(0)
    .shared_tile(jpeg_tile(256, 256, BASE_RGB))])
}

/// XMLPacket from some other vendor, no ScanInfo marker anywhere.
pub fn create_slide_with_foreign_xml() -> Vec<u8> {
    build_tiff(vec![DirectoryBuilder::tiled(
        512,
        512,
        256,
        256,
        COMPRESSION_JPEG,
    )
    .subfile_type(0)
    .xml_packet(r#"<TiffData Vendor="other" Version="3"/>"#)
    .shared_tile(jpeg_tile(256, 256, BASE_RGB))])
}

/// The marker appears in an attribute value, but the root element is not
/// ScanInfo.
pub fn create_slide_with_decoy_root() -> Vec<u8> {
    build_tiff(vec![DirectoryBuilder::tiled(
        512,
        512,
        256,
        256,
        COMPRESSION_JPEG,
    )
    .subfile_type(0)
    .xml_packet(r#"<Annotations Source="ScanInfo"/>"#)
    .shared_tile(jpeg_tile(256, 256, BASE_RGB))])
}

/// XMLPacket that mentions ScanInfo but does not parse as XML.
pub fn create_slide_with_malformed_xml() -> Vec<u8> {
    build_tiff(vec![DirectoryBuilder::tiled(
        512,
        512,
        256,
        256,
        COMPRESSION_JPEG,
    )
    .subfile_type(0)
    .xml_packet("<ScanInfo Magnification=")
    .shared_tile(jpeg_tile(256, 256, BASE_RGB))])
}

/// Minimal slide plus a reduced directory compressed with LZW, which the
/// decoder does not support.
pub fn create_slide_with_lzw_level() -> Vec<u8> {
    build_tiff(vec![
        DirectoryBuilder::tiled(512, 512, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .xml_packet(SCAN_INFO_XML)
            .shared_tile(jpeg_tile(256, 256, BASE_RGB)),
        DirectoryBuilder::tiled(600, 600, 256, 256, COMPRESSION_LZW)
            .subfile_type(1)
            .shared_tile(jpeg_tile(256, 256, MID_RGB)),
    ])
}

/// Minimal slide plus a metadata page with no ImageDescription to name
/// it.
pub fn create_slide_with_unnamed_page() -> Vec<u8> {
    build_tiff(vec![
        DirectoryBuilder::tiled(512, 512, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .xml_packet(SCAN_INFO_XML)
            .shared_tile(jpeg_tile(256, 256, BASE_RGB)),
        DirectoryBuilder::tiled(400, 300, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .shared_tile(jpeg_tile(256, 256, LABEL_RGB)),
    ])
}

/// Minimal slide plus a tiled directory that carries no NewSubfileType
/// tag at all. The walk cannot classify it and leaves it out.
pub fn create_slide_with_mystery_directory() -> Vec<u8> {
    build_tiff(vec![
        DirectoryBuilder::tiled(512, 512, 256, 256, COMPRESSION_JPEG)
            .subfile_type(0)
            .xml_packet(SCAN_INFO_XML)
            .shared_tile(jpeg_tile(256, 256, BASE_RGB)),
        DirectoryBuilder::tiled(400, 300, 256, 256, COMPRESSION_JPEG)
            .description("ghost")
            .shared_tile(jpeg_tile(256, 256, LABEL_RGB)),
    ])
}

// =============================================================================
// In-memory reader and open helpers
// =============================================================================

pub struct MemoryReader {
    data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl RangeReader for MemoryReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let end = offset
            .checked_add(len as u64)
            .filter(|&end| end <= self.data.len() as u64)
            .ok_or(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            })?;
        Ok(Bytes::copy_from_slice(
            &self.data[offset as usize..end as usize],
        ))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        "memory"
    }
}

pub async fn open_slide(data: Vec<u8>) -> Result<Slide, OpenError> {
    wsi_reader::open_from_reader(Arc::new(MemoryReader::new(data)), OpenOptions::default()).await
}

pub async fn open_slide_with_options(
    data: Vec<u8>,
    options: OpenOptions,
) -> Result<Slide, OpenError> {
    wsi_reader::open_from_reader(Arc::new(MemoryReader::new(data)), options).await
}

pub async fn detect(data: Vec<u8>) -> Result<&'static str, DetectError> {
    let reader = MemoryReader::new(data);
    wsi_reader::detect_vendor_from_reader(&reader).await
}

// =============================================================================
// Pixel assertions
// =============================================================================

pub fn pixel_at(canvas: &Canvas, x: u32, y: u32) -> [u8; 4] {
    let off = (y as usize * canvas.width() as usize + x as usize) * 4;
    let px = &canvas.pixels()[off..off + 4];
    [px[0], px[1], px[2], px[3]]
}

/// Assert an opaque pixel matches the expected color within JPEG
/// tolerance.
pub fn assert_rgb_near(pixel: [u8; 4], expected: [u8; 3]) {
    for channel in 0..3 {
        let diff = (pixel[channel] as i16 - expected[channel] as i16).abs();
        assert!(
            diff <= 30,
            "channel {channel} off by {diff}: pixel {pixel:?}, expected {expected:?}"
        );
    }
    assert_eq!(pixel[3], 255, "pixel {pixel:?} is not opaque");
}

pub fn assert_transparent(pixel: [u8; 4]) {
    assert_eq!(pixel, [0, 0, 0, 0], "pixel {pixel:?} is not transparent");
}

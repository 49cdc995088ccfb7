//! JPEG stream handling for abbreviated tile data.
//!
//! Tiled slides store each tile as an incomplete JPEG stream: the
//! quantization (DQT) and Huffman (DHT) tables are written once in the
//! container's `JPEGTables` field instead of being repeated per tile.
//! Before such a tile can go through a standard JPEG decoder, the shared
//! tables have to be spliced back in.
//!
//! The merge keeps proper JPEG structure: the tables segment contributes
//! SOI plus table markers (its EOI is dropped), the tile contributes
//! everything after its SOI.

use bytes::{Bytes, BytesMut};

/// Start Of Image marker
pub(crate) const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub(crate) const EOI: [u8; 2] = [0xFF, 0xD9];

/// Whether a JPEG stream carries its own DQT or DHT tables.
///
/// Scans marker segments from SOI until the scan header. A stream that
/// reaches SOS without any table marker is abbreviated and needs the
/// shared tables merged in.
pub(crate) fn stream_has_tables(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        match data[pos + 1] {
            0xDB | 0xC4 => return true, // DQT or DHT
            0xDA => return false,       // SOS: entropy-coded data follows
            // Markers without a length field: padding, SOI/EOI, restarts
            0x00 | 0x01 | 0xD8 | 0xD9 | 0xD0..=0xD7 => pos += 2,
            _ => {
                if pos + 3 >= data.len() {
                    return false;
                }
                let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + length;
            }
        }
    }

    false
}

/// Splice shared JPEG tables into an abbreviated tile stream.
///
/// The tables block keeps its leading SOI but loses its trailing EOI; the
/// tile loses its leading SOI but keeps its trailing EOI. Missing markers
/// on either side are tolerated.
pub(crate) fn merge_tables(tables: &[u8], tile_data: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile_data);
    }
    if tile_data.is_empty() {
        return Bytes::new();
    }

    let tables_end = if tables.len() >= 2 && tables[tables.len() - 2..] == EOI {
        tables.len() - 2
    } else {
        tables.len()
    };
    let tile_start = if tile_data.len() >= 2 && tile_data[0..2] == SOI {
        2
    } else {
        0
    };

    let mut merged = BytesMut::with_capacity(tables_end + tile_data.len() - tile_start);
    merged.extend_from_slice(&tables[..tables_end]);
    merged.extend_from_slice(&tile_data[tile_start..]);
    merged.freeze()
}

/// Produce a decodable JPEG stream for one tile.
///
/// Complete streams pass through untouched; abbreviated ones get the
/// shared tables merged in when available.
pub(crate) fn prepare_tile(tables: Option<&[u8]>, tile_data: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !stream_has_tables(tile_data) => merge_tables(tables, tile_data),
        _ => Bytes::copy_from_slice(tile_data),
    }
}

// =============================================================================
// Tests
// =============================================================================

//! First-pass scanning of `OSMData` blocks.
//!
//! The scan records, for every primitive group, where each element lives
//! inside the decompressed block, decodes the string table, and extracts node
//! coordinates for the file-wide coordinate cache. Queries later re-read only
//! the recorded spans.

use crate::blob::Compression;
use crate::codec::{self, WireType};
use crate::error::{new_error, ErrorKind, Result};

/// Location of one element inside a decompressed block.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ElementAt {
    pub id: i64,
    pub offset: usize,
    pub len: usize,
}

/// Everything the first pass learns about one `OSMData` block.
#[derive(Debug, Default)]
pub(crate) struct BlockScan {
    pub strings: Vec<String>,
    pub date_granularity: i32,
    pub dense: Option<(usize, usize)>,
    pub nodes: Vec<ElementAt>,
    pub ways: Vec<ElementAt>,
    pub relations: Vec<ElementAt>,
    /// Node coordinates as `(id, nano lon, nano lat)`.
    pub points: Vec<(i64, i64, i64)>,
}

/// The per-block index entry kept for the lifetime of an [`Osm`](crate::Osm).
///
/// `strings` is the local-to-global string id map produced by the dictionary
/// merge; element offsets are relative to the decompressed block.
#[derive(Debug)]
pub(crate) struct BlockMeta {
    pub start: u64,
    pub end: u64,
    pub compression: Compression,
    pub raw_size: Option<usize>,
    pub strings: Vec<u32>,
    pub date_granularity: i32,
    pub dense: Option<(usize, usize)>,
    pub nodes: Vec<ElementAt>,
    pub ways: Vec<ElementAt>,
    pub relations: Vec<ElementAt>,
}

/// Walks a decompressed `OSMData` block.
///
/// Field 1 is the string table, field 2 a primitive group and fields 17-20
/// the granularity, date granularity and coordinate offsets (defaults 100,
/// 100, 0, 0). Granularity is only applied once the whole block has been
/// walked since those fields may follow the groups.
pub(crate) fn scan_block(data: &[u8]) -> Result<BlockScan> {
    let mut scan = BlockScan {
        date_granularity: 100,
        ..BlockScan::default()
    };
    let mut granularity = 100i64;
    let mut lat_offset = 0i64;
    let mut lon_offset = 0i64;

    let mut offset = 0;
    while offset < data.len() {
        let (key, next) = codec::key(data, offset)?;
        match (key.field, key.wire) {
            (1, WireType::Len) => {
                scan.strings = read_string_table(data, next, key.len)?;
            }
            (2, WireType::Len) => {
                scan_group(data, next, key.len, &mut scan)?;
            }
            (17, WireType::Varint) => {
                let (v, _) = codec::int32(data, next)?;
                granularity = i64::from(v);
            }
            (18, WireType::Varint) => {
                let (v, _) = codec::int32(data, next)?;
                scan.date_granularity = v;
            }
            (19, WireType::Varint) => {
                let (v, _) = codec::int64(data, next)?;
                lat_offset = v;
            }
            (20, WireType::Varint) => {
                let (v, _) = codec::int64(data, next)?;
                lon_offset = v;
            }
            _ => {}
        }
        offset = next + key.len;
    }

    for (_, lon, lat) in &mut scan.points {
        *lon = *lon * granularity + lon_offset;
        *lat = *lat * granularity + lat_offset;
    }

    Ok(scan)
}

/// Decodes a string table message (repeated bytes in field 1).
///
/// Tables carrying nothing beyond `""`, `"source"` and `"source:date"` are
/// recorded as empty: such blocks hold no user-visible strings and can be
/// skipped by every tag-touching query.
fn read_string_table(data: &[u8], offset: usize, len: usize) -> Result<Vec<String>> {
    let end = offset + len;
    let mut strings = Vec::new();
    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        if key.field == 1 && key.wire == WireType::Len {
            let s = std::str::from_utf8(&data[next..next + key.len]).map_err(|err| {
                new_error(ErrorKind::StringtableUtf8 {
                    err,
                    index: strings.len(),
                })
            })?;
            strings.push(s.to_owned());
        }
        pos = next + key.len;
    }

    let trivial = ["", "source", "source:date"];
    if strings.iter().all(|s| trivial.contains(&s.as_str())) {
        strings.clear();
    }
    Ok(strings)
}

/// Walks one primitive group: field 1 node, 2 dense nodes, 3 way, 4 relation.
fn scan_group(data: &[u8], offset: usize, len: usize, scan: &mut BlockScan) -> Result<()> {
    let end = offset + len;
    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Len) => {
                let (id, lon, lat) = scan_node(data, next, key.len)?;
                scan.nodes.push(ElementAt {
                    id,
                    offset: next,
                    len: key.len,
                });
                scan.points.push((id, lon, lat));
            }
            (2, WireType::Len) => {
                scan.dense = Some((next, key.len));
                scan_dense(data, next, key.len, &mut scan.points)?;
            }
            (3, WireType::Len) => {
                scan.ways.push(ElementAt {
                    id: element_id(data, next, key.len)?,
                    offset: next,
                    len: key.len,
                });
            }
            (4, WireType::Len) => {
                scan.relations.push(ElementAt {
                    id: element_id(data, next, key.len)?,
                    offset: next,
                    len: key.len,
                });
            }
            _ => {}
        }
        pos = next + key.len;
    }
    Ok(())
}

/// Extracts id (field 1), latitude (field 8) and longitude (field 9) of a
/// plain node, all zig-zag coded.
fn scan_node(data: &[u8], offset: usize, len: usize) -> Result<(i64, i64, i64)> {
    let end = offset + len;
    let (mut id, mut lon, mut lat) = (0i64, 0i64, 0i64);
    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Varint) => (id, _) = codec::sint64(data, next)?,
            (8, WireType::Varint) => (lat, _) = codec::sint64(data, next)?,
            (9, WireType::Varint) => (lon, _) = codec::sint64(data, next)?,
            _ => {}
        }
        pos = next + key.len;
    }
    Ok((id, lon, lat))
}

/// Extracts the delta-coded id/lat/lon arrays of a dense group.
fn scan_dense(data: &[u8], offset: usize, len: usize, points: &mut Vec<(i64, i64, i64)>) -> Result<()> {
    let end = offset + len;
    let mut ids = Vec::new();
    let mut lats = Vec::new();
    let mut lons = Vec::new();
    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Len) => ids = codec::packed_sint64(data, next, key.len, true)?,
            (8, WireType::Len) => lats = codec::packed_sint64(data, next, key.len, true)?,
            (9, WireType::Len) => lons = codec::packed_sint64(data, next, key.len, true)?,
            _ => {}
        }
        pos = next + key.len;
    }
    for ((&id, &lon), &lat) in ids.iter().zip(&lons).zip(&lats) {
        points.push((id, lon, lat));
    }
    Ok(())
}

/// Reads just the id (field 1) of a way or relation and stops.
fn element_id(data: &[u8], offset: usize, len: usize) -> Result<i64> {
    let end = offset + len;
    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        if key.field == 1 && key.wire == WireType::Varint {
            let (id, _) = codec::int64(data, next)?;
            return Ok(id);
        }
        pos = next + key.len;
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_message(strings: &[&str]) -> Vec<u8> {
        let mut data = Vec::new();
        for s in strings {
            data.push(0x0a);
            data.push(s.len() as u8);
            data.extend_from_slice(s.as_bytes());
        }
        data
    }

    #[test]
    fn trivial_string_table_is_dropped() {
        let data = table_message(&["", "source", "source:date"]);
        let strings = read_string_table(&data, 0, data.len()).unwrap();
        assert!(strings.is_empty());

        let data = table_message(&["", "highway"]);
        let strings = read_string_table(&data, 0, data.len()).unwrap();
        assert_eq!(strings, vec!["".to_owned(), "highway".to_owned()]);
    }
}

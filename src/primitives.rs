//! Parsers for individual nodes, ways and relations.
//!
//! Each parser decodes one element from its recorded span, evaluates the
//! block-level predicate and, on acceptance, appends rows to the block
//! result. Rejection is not an error; the element is simply dropped.

use crate::block::{BlockMeta, ElementAt};
use crate::codec::{self, WireType};
use crate::error::Result;
use crate::query::{pack_tagval, BlockQuery};
use crate::records::{BlockRows, ElementInfo, ElementType, GeomClass};

/// Decodes a plain (non-dense) node.
pub(crate) fn parse_node(
    data: &[u8],
    at: ElementAt,
    query: &BlockQuery,
    meta: &BlockMeta,
    out: &mut BlockRows,
) -> Result<()> {
    let end = at.offset + at.len;
    let mut id = 0i64;
    let mut keys = Vec::new();
    let mut vals = Vec::new();
    let mut info = query.metadata.then_some(MISSING_INFO);

    let mut pos = at.offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Varint) => (id, _) = codec::sint64(data, next)?,
            (2, WireType::Len) if query.get_tags => {
                keys = codec::packed_uint32(data, next, key.len)?;
                if !query.must_ok(&keys) {
                    return Ok(());
                }
            }
            (3, WireType::Len) if query.get_tags => {
                vals = codec::packed_uint32(data, next, key.len)?;
            }
            (4, WireType::Len) if query.metadata => {
                info = Some(parse_info(data, next, key.len, meta.date_granularity)?);
            }
            _ => {}
        }
        pos = next + key.len;
    }

    if !query.must_ok(&keys) || !query.accepts_tags(&keys, &vals) {
        return Ok(());
    }
    let (keys, vals) = query.project_tags(keys, vals);
    out.push_element(id, ElementType::Node, info, &keys, &vals, &meta.strings);
    Ok(())
}

/// Decodes a way; node references are delta-coded `sint64` in field 8.
pub(crate) fn parse_way(
    data: &[u8],
    at: ElementAt,
    query: &BlockQuery,
    meta: &BlockMeta,
    out: &mut BlockRows,
) -> Result<()> {
    let end = at.offset + at.len;
    let mut id = 0i64;
    let mut keys = Vec::new();
    let mut vals = Vec::new();
    let mut refs = Vec::new();
    let mut info = query.metadata.then_some(MISSING_INFO);

    let mut pos = at.offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Varint) => (id, _) = codec::int64(data, next)?,
            (2, WireType::Len) if query.get_tags => {
                keys = codec::packed_uint32(data, next, key.len)?;
                if !query.must_ok(&keys) {
                    return Ok(());
                }
            }
            (3, WireType::Len) if query.get_tags => {
                vals = codec::packed_uint32(data, next, key.len)?;
            }
            (4, WireType::Len) if query.metadata => {
                info = Some(parse_info(data, next, key.len, meta.date_granularity)?);
            }
            (8, WireType::Len) => {
                refs = codec::packed_sint64(data, next, key.len, true)?;
                // a way needs at least two points
                if refs.len() < 2 {
                    return Ok(());
                }
            }
            _ => {}
        }
        pos = next + key.len;
    }

    if refs.len() < 2 {
        return Ok(());
    }
    if !query.must_ok(&keys) || !query.accepts_tags(&keys, &vals) {
        return Ok(());
    }
    let geom = way_class(query, &keys, &vals, &refs);
    let (keys, vals) = query.project_tags(keys, vals);
    let row = out.push_element(id, ElementType::Way, info, &keys, &vals, &meta.strings);
    if query.geometry {
        out.push_way_refs(row, &refs, geom);
    }
    Ok(())
}

/// Decodes a relation; roles are string ids in field 8, member ids
/// delta-coded in field 9 and member types enum-coded in field 10.
pub(crate) fn parse_relation(
    data: &[u8],
    at: ElementAt,
    query: &BlockQuery,
    meta: &BlockMeta,
    out: &mut BlockRows,
) -> Result<()> {
    let end = at.offset + at.len;
    let mut id = 0i64;
    let mut keys = Vec::new();
    let mut vals = Vec::new();
    let mut roles = Vec::new();
    let mut member_ids = Vec::new();
    let mut member_types = Vec::new();
    let mut info = query.metadata.then_some(MISSING_INFO);

    let mut pos = at.offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Varint) => (id, _) = codec::int64(data, next)?,
            (2, WireType::Len) if query.get_tags => {
                keys = codec::packed_uint32(data, next, key.len)?;
                if !query.must_ok(&keys) {
                    return Ok(());
                }
            }
            (3, WireType::Len) if query.get_tags => {
                vals = codec::packed_uint32(data, next, key.len)?;
            }
            (4, WireType::Len) if query.metadata => {
                info = Some(parse_info(data, next, key.len, meta.date_granularity)?);
            }
            (8, WireType::Len) => {
                roles = codec::packed_uint32(data, next, key.len)?;
            }
            (9, WireType::Len) => {
                member_ids = codec::packed_sint64(data, next, key.len, true)?;
            }
            (10, WireType::Len) => {
                member_types = codec::packed_uint32(data, next, key.len)?;
            }
            _ => {}
        }
        pos = next + key.len;
    }

    if !query.relation_type_ok(&vals) {
        return Ok(());
    }
    if !query.must_ok(&keys) || !query.accepts_tags(&keys, &vals) {
        return Ok(());
    }
    let geom = relation_class(query, &vals, &member_types);
    let (keys, vals) = query.project_tags(keys, vals);
    let row = out.push_element(id, ElementType::Relation, info, &keys, &vals, &meta.strings);
    out.push_relation_members(row, &member_ids, &member_types, &roles, geom, &meta.strings);
    Ok(())
}

/// Metadata columns of an element whose `Info` field is absent.
pub(crate) const MISSING_INFO: ElementInfo = ElementInfo {
    version: -1,
    timestamp: 0,
    changeset: 0,
};

/// Decodes an `Info` sub-message: version, timestamp and changeset.
/// Timestamps are scaled by the block's date granularity to milliseconds.
pub(crate) fn parse_info(
    data: &[u8],
    offset: usize,
    len: usize,
    date_granularity: i32,
) -> Result<ElementInfo> {
    let end = offset + len;
    let mut info = MISSING_INFO;
    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Varint) => (info.version, _) = codec::int32(data, next)?,
            (2, WireType::Varint) => {
                let (t, _) = codec::int64(data, next)?;
                info.timestamp = t * i64::from(date_granularity);
            }
            (3, WireType::Varint) => (info.changeset, _) = codec::int64(data, next)?,
            _ => {}
        }
        pos = next + key.len;
    }
    Ok(info)
}

/// The line/area heuristic for ways.
///
/// Anything open or too short stays a line; closed ways are judged by the
/// area tag tables compiled into the block query.
pub(crate) fn way_class(query: &BlockQuery, keys: &[u32], vals: &[u32], refs: &[i64]) -> GeomClass {
    if keys.is_empty() || !query.geometry || !query.area {
        return GeomClass::None;
    }
    if refs.len() < 2 {
        return GeomClass::None;
    }
    if refs.len() < 4 {
        return GeomClass::Line;
    }
    if refs.first() != refs.last() {
        return GeomClass::Line;
    }

    let pairs: Vec<u64> = keys
        .iter()
        .zip(vals)
        .filter(|(k, _)| query.is_area_key.contains(k))
        .map(|(&k, &v)| pack_tagval(k, v))
        .collect();

    if pairs.iter().any(|p| query.area_no.contains(p)) {
        return GeomClass::Line;
    }
    if pairs.iter().any(|p| query.is_area.contains(p)) {
        return GeomClass::Area;
    }
    if pairs.iter().any(|p| query.not_area.contains(p)) {
        return GeomClass::Line;
    }
    if keys.iter().any(|k| query.is_area_key_any.contains(k)) {
        return GeomClass::Area;
    }
    GeomClass::Line
}

/// Geometry classification of a relation, dispatched on its `type`-like tag
/// values. Relations with node or nested relation members are left at class
/// zero; heterogeneous geometry is not assembled.
pub(crate) fn relation_class(query: &BlockQuery, vals: &[u32], member_types: &[u32]) -> GeomClass {
    if !query.geometry || vals.is_empty() {
        return GeomClass::None;
    }
    if member_types.iter().any(|&t| t == 0 || t == 2) {
        return GeomClass::None;
    }
    if vals.iter().any(|v| query.rel_line.contains(v)) {
        return GeomClass::Line;
    }
    if vals.iter().any(|v| query.rel_area.contains(v)) {
        return GeomClass::Area;
    }
    GeomClass::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // String ids for the fixture: building=1, yes=2, highway=3, footway=4,
    // area=5, no=6.
    fn area_query() -> BlockQuery {
        BlockQuery {
            nodes: false,
            metadata: false,
            geometry: true,
            keep_first: true,
            get_tags: true,
            has_filters: false,
            node_offsets: Vec::new(),
            way_offsets: Vec::new(),
            rel_offsets: Vec::new(),
            dense: None,
            node_set: None,
            tags: None,
            must_tags: None,
            relation_type: None,
            keep: HashSet::new(),
            keep_all: HashSet::new(),
            excl: HashSet::new(),
            excl_all: HashSet::new(),
            area_no: [pack_tagval(5, 6)].into(),
            is_area: HashSet::new(),
            not_area: HashSet::new(),
            is_area_key: [1, 3, 5].into(),
            is_area_key_any: [1, 5].into(),
            area: true,
            rel_area: HashSet::new(),
            rel_line: HashSet::new(),
        }
    }

    const CLOSED: [i64; 5] = [1, 2, 3, 4, 1];

    #[test]
    fn closed_building_is_an_area() {
        let q = area_query();
        assert_eq!(way_class(&q, &[1], &[2], &CLOSED), GeomClass::Area);
    }

    #[test]
    fn closed_footway_stays_a_line() {
        let q = area_query();
        assert_eq!(way_class(&q, &[3], &[4], &CLOSED), GeomClass::Line);
    }

    #[test]
    fn area_no_overrides_building() {
        let q = area_query();
        assert_eq!(way_class(&q, &[1, 5], &[2, 6], &CLOSED), GeomClass::Line);
    }

    #[test]
    fn open_ways_are_lines() {
        let q = area_query();
        assert_eq!(way_class(&q, &[1], &[2], &[1, 2, 3, 4, 5]), GeomClass::Line);
        assert_eq!(way_class(&q, &[1], &[2], &[1, 2, 1]), GeomClass::Line);
        assert_eq!(way_class(&q, &[1], &[2], &[1]), GeomClass::None);
    }

    #[test]
    fn tagless_ways_skip_the_area_decision() {
        let q = area_query();
        assert_eq!(way_class(&q, &[], &[], &CLOSED), GeomClass::None);
    }
}

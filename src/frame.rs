//! Materializes merged query rows into the final [`Frame`]: member-way
//! absorption, geometry or topology attachment, and the closing sort by
//! `osm_id`.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::geometry::{assemble, Geometry};
use crate::osm::CoordCache;
use crate::query::Query;
use crate::records::{BlockRows, ElementType, Identifier, MemberEdge, TagTriple};
use crate::topology::{split_at_shared, Segment};

/// The tabular result of a query.
///
/// `tags`, `members` and `segments` reference identifier rows by index;
/// `geometries`, when present, is parallel to `ids`. Rows are sorted by
/// `osm_id`.
#[derive(Debug, Default, PartialEq)]
pub struct Frame {
    pub ids: Vec<Identifier>,
    pub tags: Vec<TagTriple>,
    pub members: Vec<MemberEdge>,
    /// One geometry per identifier row; empty unless the query asked for
    /// geometry.
    pub geometries: Vec<Option<Geometry>>,
    /// Topology segments; empty unless the query asked for topology.
    pub segments: Vec<Segment>,
}

pub(crate) fn build(
    query: &Query,
    rows: BlockRows,
    ways: Option<HashMap<i64, Vec<i64>>>,
    strings: &[String],
    coords: &CoordCache,
) -> Frame {
    let BlockRows {
        mut ids,
        mut tags,
        mut members,
    } = rows;

    // Ways absorbed into a relation geometry disappear as standalone rows.
    if let Some(ways) = &ways {
        if !ways.is_empty() {
            let absorbed: HashSet<i64> = ways.keys().copied().collect();
            let mut remap = vec![usize::MAX; ids.len()];
            let mut kept = Vec::with_capacity(ids.len());
            for (row, id) in ids.into_iter().enumerate() {
                if id.osm_type == ElementType::Way && absorbed.contains(&id.osm_id) {
                    continue;
                }
                remap[row] = kept.len();
                kept.push(id);
            }
            ids = kept;
            tags.retain_mut(|t| {
                t.row = remap[t.row];
                t.row != usize::MAX
            });
            members.retain_mut(|m| {
                m.row = remap[m.row];
                m.row != usize::MAX
            });
        }
    }

    let mut segments = Vec::new();
    let mut geometries = Vec::new();
    if query.topology {
        let mut way_lists: BTreeMap<usize, Vec<i64>> = BTreeMap::new();
        for member in &members {
            if ids[member.row].osm_type == ElementType::Way {
                way_lists.entry(member.row).or_default().push(member.member_id);
            }
        }
        let way_lists: Vec<(usize, Vec<i64>)> = way_lists.into_iter().collect();
        for (row, nodes) in split_at_shared(&way_lists) {
            segments.push(Segment {
                row,
                source: nodes[0],
                target: *nodes.last().unwrap(),
                points: nodes.iter().filter_map(|&n| coords.get(n)).collect(),
            });
        }
    } else if query.geometry {
        geometries = assemble(&ids, &members, ways.as_ref(), strings, coords);
    }

    // Final sort by osm_id; everything row-indexed follows the permutation.
    let mut order: Vec<usize> = (0..ids.len()).collect();
    order.sort_by_key(|&row| ids[row].osm_id);
    let mut position = vec![0usize; ids.len()];
    for (new, &old) in order.iter().enumerate() {
        position[old] = new;
    }

    let ids: Vec<Identifier> = order.iter().map(|&old| ids[old]).collect();
    let geometries = if geometries.is_empty() {
        geometries
    } else {
        let mut sorted: Vec<Option<Geometry>> = vec![None; geometries.len()];
        for (old, geom) in geometries.into_iter().enumerate() {
            sorted[position[old]] = geom;
        }
        sorted
    };
    for t in &mut tags {
        t.row = position[t.row];
    }
    for m in &mut members {
        m.row = position[m.row];
    }
    for s in &mut segments {
        s.row = position[s.row];
    }
    tags.sort_by_key(|t| t.row);
    members.sort_by_key(|m| m.row);
    segments.sort_by_key(|s| s.row);

    Frame {
        ids,
        tags,
        members,
        geometries,
        segments,
    }
}

//! Geometry assembly: coordinate lookup, ring ordering for multipolygon
//! relations and polygon grouping.
//!
//! Ways draw directly from their node references. Relations arrive as
//! unordered members; their ways are joined end to end into oriented rings,
//! rings are grouped into polygons (an outer ring plus the inner rings that
//! follow it) and polygons sharing a relation row form a multipolygon.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::osm::CoordCache;
use crate::records::{ElementType, GeomClass, Identifier, MemberEdge};

/// An assembled geometry in WGS84 lon/lat order.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point([f32; 2]),
    LineString(Vec<[f32; 2]>),
    /// The first ring is the exterior, any further rings are holes.
    Polygon(Vec<Vec<[f32; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f32; 2]>>>),
}

/// Role of a relation member in ring assembly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RingRole {
    Outer,
    Inner,
    /// Any other role; such ways are implicit outers, each its own ring.
    Other,
}

impl RingRole {
    fn from_str(role: &str) -> RingRole {
        match role {
            "outer" => RingRole::Outer,
            "inner" => RingRole::Inner,
            _ => RingRole::Other,
        }
    }
}

/// One way member queued for ring assembly.
#[derive(Clone, Debug)]
pub(crate) struct RingMember {
    pub role: RingRole,
    pub nodes: Vec<i64>,
}

/// A reconstructed ring: a closed node sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Ring {
    pub role: RingRole,
    pub nodes: Vec<i64>,
}

/// Orders the members of one relation row into closed rings.
///
/// Members with a role other than outer/inner each become their own ring.
/// Closed outer/inner ways become rings directly; the rest are chained by
/// shared end nodes, reversing a member when its far end matches the open
/// node. The traversal touches every member exactly once and terminates for
/// any finite member set.
pub(crate) fn order_rings(members: Vec<RingMember>) -> Vec<Ring> {
    let mut rings = Vec::new();
    let mut open: Vec<RingMember> = Vec::new();

    for member in members {
        if member.nodes.is_empty() {
            continue;
        }
        match member.role {
            RingRole::Other => rings.push(close(Ring {
                role: RingRole::Other,
                nodes: member.nodes,
            })),
            _ if member.nodes.first() == member.nodes.last() && member.nodes.len() > 1 => {
                rings.push(Ring {
                    role: member.role,
                    nodes: member.nodes,
                });
            }
            _ => open.push(member),
        }
    }

    for role in [RingRole::Outer, RingRole::Inner] {
        let group: Vec<&RingMember> = open.iter().filter(|m| m.role == role).collect();
        rings.extend(traverse(&group, role));
    }
    rings
}

/// Chains open members of one role group into rings.
fn traverse(group: &[&RingMember], role: RingRole) -> Vec<Ring> {
    let mut rings = Vec::new();
    let mut used = vec![false; group.len()];
    let mut remaining = group.len();

    while remaining > 0 {
        let start = used.iter().position(|u| !u).unwrap();
        used[start] = true;
        remaining -= 1;
        let mut nodes = group[start].nodes.clone();

        loop {
            let current = *nodes.last().unwrap();
            // Prefer a member starting at the open node; fall back to one
            // ending there, traversed in reverse.
            let forward = group
                .iter()
                .enumerate()
                .find(|(i, m)| !used[*i] && *m.nodes.first().unwrap() == current)
                .map(|(i, _)| (i, false));
            let linked = forward.or_else(|| {
                group
                    .iter()
                    .enumerate()
                    .find(|(i, m)| !used[*i] && *m.nodes.last().unwrap() == current)
                    .map(|(i, _)| (i, true))
            });

            let Some((index, reversed)) = linked else {
                break;
            };
            used[index] = true;
            remaining -= 1;
            if reversed {
                append_nodes(&mut nodes, group[index].nodes.iter().rev().copied());
            } else {
                append_nodes(&mut nodes, group[index].nodes.iter().copied());
            }
        }

        rings.push(close(Ring { role, nodes }));
    }
    rings
}

/// Appends a node sequence, dropping nodes equal to the running last one so
/// shared junction nodes appear once per ring.
fn append_nodes(nodes: &mut Vec<i64>, seq: impl Iterator<Item = i64>) {
    for n in seq {
        if nodes.last() != Some(&n) {
            nodes.push(n);
        }
    }
}

/// Closes a ring by repeating its first node when needed.
fn close(mut ring: Ring) -> Ring {
    if ring.nodes.first() != ring.nodes.last() {
        let first = ring.nodes[0];
        ring.nodes.push(first);
    }
    ring
}

/// Within one relation row, drops every inner ring when both the outer and
/// the inner count exceed one: which inner belongs to which outer is
/// ambiguous and intentionally discarded.
pub(crate) fn drop_ambiguous_inners(rings: Vec<Ring>) -> Vec<Ring> {
    let outers = rings.iter().filter(|r| r.role == RingRole::Outer).count();
    let inners = rings.iter().filter(|r| r.role == RingRole::Inner).count();
    if outers > 1 && inners > 1 {
        rings.into_iter().filter(|r| r.role != RingRole::Inner).collect()
    } else {
        rings
    }
}

/// Groups rings into polygons, in ring order: every outer (or implicit
/// outer) ring starts a polygon and an inner ring attaches to the most
/// recently seen outer. An inner with no outer before it starts its own
/// polygon.
pub(crate) fn group_polygons(rings: Vec<Ring>) -> Vec<Vec<Ring>> {
    let mut polygons: Vec<Vec<Ring>> = Vec::new();
    for ring in rings {
        if ring.role != RingRole::Inner || polygons.is_empty() {
            polygons.push(vec![ring]);
        } else {
            polygons.last_mut().unwrap().push(ring);
        }
    }
    polygons
}

/// Builds one geometry per identifier row.
///
/// `ways` supplies the ordered node lists of member ways when relation
/// geometries were requested. Rows of class zero relations stay empty;
/// class-zero ways still draw as linestrings.
pub(crate) fn assemble(
    ids: &[Identifier],
    members: &[MemberEdge],
    ways: Option<&HashMap<i64, Vec<i64>>>,
    strings: &[String],
    coords: &CoordCache,
) -> Vec<Option<Geometry>> {
    let mut by_row: BTreeMap<usize, Vec<&MemberEdge>> = BTreeMap::new();
    for member in members {
        by_row.entry(member.row).or_default().push(member);
    }

    ids.iter()
        .enumerate()
        .map(|(row, id)| match id.osm_type {
            ElementType::Node => coords.get(id.osm_id).map(Geometry::Point),
            ElementType::Way => {
                let members = by_row.get(&row)?;
                way_geometry(members, coords)
            }
            ElementType::Relation => {
                let members = by_row.get(&row)?;
                relation_geometry(members, ways?, strings, coords)
            }
        })
        .collect()
}

fn way_geometry(members: &[&MemberEdge], coords: &CoordCache) -> Option<Geometry> {
    let points: Vec<[f32; 2]> = members
        .iter()
        .filter_map(|m| coords.get(m.member_id))
        .collect();
    if points.len() < 2 {
        return None;
    }
    match members[0].geom {
        GeomClass::Area => Some(Geometry::Polygon(vec![points])),
        _ => Some(Geometry::LineString(points)),
    }
}

fn relation_geometry(
    members: &[&MemberEdge],
    ways: &HashMap<i64, Vec<i64>>,
    strings: &[String],
    coords: &CoordCache,
) -> Option<Geometry> {
    match members[0].geom {
        GeomClass::Point => coords.get(members[0].member_id).map(Geometry::Point),
        GeomClass::Line => {
            let mut nodes: Vec<i64> = Vec::new();
            for member in members {
                if let Some(way_nodes) = ways.get(&member.member_id) {
                    nodes.extend(way_nodes.iter().copied());
                }
            }
            let points: Vec<[f32; 2]> =
                nodes.iter().filter_map(|&n| coords.get(n)).collect();
            (points.len() >= 2).then_some(Geometry::LineString(points))
        }
        GeomClass::Area => {
            let ring_members: Vec<RingMember> = members
                .iter()
                .filter(|m| m.member_type == ElementType::Way)
                .filter_map(|m| {
                    let nodes = ways.get(&m.member_id)?.clone();
                    let role = strings
                        .get(m.role as usize)
                        .map(|s| RingRole::from_str(s))
                        .unwrap_or(RingRole::Other);
                    Some(RingMember { role, nodes })
                })
                .collect();
            if ring_members.is_empty() {
                return None;
            }
            let rings = drop_ambiguous_inners(order_rings(ring_members));
            let polygons: Vec<Vec<Vec<[f32; 2]>>> = group_polygons(rings)
                .into_iter()
                .map(|rings| {
                    rings
                        .into_iter()
                        .map(|ring| {
                            ring.nodes
                                .iter()
                                .filter_map(|&n| coords.get(n))
                                .collect::<Vec<[f32; 2]>>()
                        })
                        .collect()
                })
                .collect();
            match polygons.len() {
                0 => None,
                1 => Some(Geometry::Polygon(polygons.into_iter().next().unwrap())),
                _ => Some(Geometry::MultiPolygon(polygons)),
            }
        }
        _ => None,
    }
}

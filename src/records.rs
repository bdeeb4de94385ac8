//! Typed result records.
//!
//! Elements accepted by a block parse are stacked into three rectangular
//! collections per block — identifiers, tag triples and member edges — which
//! are then merged across blocks by shifting the block-local row references.

/// The kind of an OSM element; also the type of a relation member.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ElementType {
    Node = 0,
    Way = 1,
    Relation = 2,
}

impl ElementType {
    pub(crate) fn from_code(code: u32) -> ElementType {
        match code {
            1 => ElementType::Way,
            2 => ElementType::Relation,
            _ => ElementType::Node,
        }
    }
}

/// Geometry classification of a way or relation member contribution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GeomClass {
    /// No geometry decision; ways of this class still draw as linestrings.
    None = 0,
    Point = 1,
    Line = 2,
    Area = 3,
}

/// Optional element metadata.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ElementInfo {
    pub version: i32,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub changeset: i64,
}

/// One identifier row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Identifier {
    pub osm_id: i64,
    pub osm_type: ElementType,
    pub info: Option<ElementInfo>,
}

/// One tag of one element. `row` indexes the identifier rows; `key` and
/// `value` are global string ids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TagTriple {
    pub row: usize,
    pub key: u32,
    pub value: u32,
}

/// One membership edge: a node reference of a way, or a member of a
/// relation. `role` is a global string id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemberEdge {
    pub row: usize,
    pub member_id: i64,
    pub member_type: ElementType,
    pub role: u32,
    pub geom: GeomClass,
}

/// Rows produced by parsing one block (or by merging several).
#[derive(Debug, Default)]
pub(crate) struct BlockRows {
    pub ids: Vec<Identifier>,
    pub tags: Vec<TagTriple>,
    pub members: Vec<MemberEdge>,
}

impl BlockRows {
    /// Appends one element's identifier row and its projected tags, mapping
    /// local string ids through the block's local-to-global table. Returns
    /// the new row index.
    pub(crate) fn push_element(
        &mut self,
        osm_id: i64,
        osm_type: ElementType,
        info: Option<ElementInfo>,
        keys: &[u32],
        vals: &[u32],
        strings: &[u32],
    ) -> usize {
        let row = self.ids.len();
        self.ids.push(Identifier {
            osm_id,
            osm_type,
            info,
        });
        for (&k, &v) in keys.iter().zip(vals) {
            let (Some(&key), Some(&value)) = (strings.get(k as usize), strings.get(v as usize))
            else {
                continue;
            };
            self.tags.push(TagTriple { row, key, value });
        }
        row
    }

    /// Appends the node references of a way as member edges.
    pub(crate) fn push_way_refs(&mut self, row: usize, refs: &[i64], geom: GeomClass) {
        for &node_id in refs {
            self.members.push(MemberEdge {
                row,
                member_id: node_id,
                member_type: ElementType::Node,
                role: 0,
                geom,
            });
        }
    }

    /// Appends the members of a relation, mapping role string ids to the
    /// global domain.
    pub(crate) fn push_relation_members(
        &mut self,
        row: usize,
        member_ids: &[i64],
        member_types: &[u32],
        roles: &[u32],
        geom: GeomClass,
        strings: &[u32],
    ) {
        for ((&member_id, &type_code), &role) in
            member_ids.iter().zip(member_types).zip(roles)
        {
            let role = strings.get(role as usize).copied().unwrap_or(0);
            self.members.push(MemberEdge {
                row,
                member_id,
                member_type: ElementType::from_code(type_code),
                role,
                geom,
            });
        }
    }
}

/// Merges per-block rows in block order, shifting the block-local row
/// references to global positions.
pub(crate) fn merge(blocks: Vec<BlockRows>) -> BlockRows {
    let mut merged = BlockRows::default();
    for block in blocks {
        let shift = merged.ids.len();
        merged.ids.extend(block.ids);
        merged.tags.extend(block.tags.into_iter().map(|mut t| {
            t.row += shift;
            t
        }));
        merged.members.extend(block.members.into_iter().map(|mut m| {
            m.row += shift;
            m
        }));
    }
    merged
}

//! The user-level [`Query`] and its per-block compilation.
//!
//! A `Query` is expressed in strings; before a block is parsed it is lowered
//! into the block's integer string domain. Blocks whose dictionary cannot
//! satisfy the query are skipped without being decompressed.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::block::{BlockMeta, ElementAt};
use crate::defaults::{
    heuristic_strings, AREA_NO, IS_AREA, IS_AREA_KEY_ANY_VALUE, NOT_AREA, RELATION_AREA,
    RELATION_LINESTRING,
};
use crate::error::{new_error, ErrorKind, Result};

/// Which tags of an accepted element end up in the result.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum TagProjection {
    /// Keep every tag.
    #[default]
    All,
    /// Keep no tags.
    None,
    /// Keep only the listed keys.
    Keys(Vec<String>),
}

/// A description of what to extract from a PBF file.
///
/// The struct is plain data; fill in the fields you need and leave the rest
/// to [`Default`].
///
/// ```
/// use osmdata::Query;
///
/// let query = Query {
///     ways: true,
///     keep: [("highway".to_owned(), vec![])].into(),
///     geometry: true,
///     ..Query::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Query {
    /// Select node elements.
    pub nodes: bool,
    /// Select way elements.
    pub ways: bool,
    /// Select relation elements.
    pub relations: bool,
    /// An element must carry at least one of these keys.
    pub must_tags: Vec<String>,
    /// Tags to keep, as key to value list. An empty value list keeps every
    /// value of that key.
    pub keep: BTreeMap<String, Vec<String>>,
    /// Tags to exclude, same shape as `keep`.
    pub exclude: BTreeMap<String, Vec<String>>,
    /// If true, an element must match `keep` and not `exclude`; if false, an
    /// element is kept unless it matches `exclude` without also matching
    /// `keep`.
    pub keep_first: bool,
    /// Which tags of accepted elements to report.
    pub tags: TagProjection,
    /// Restrict nodes to this id set.
    pub node_ids: Option<BTreeSet<i64>>,
    /// Restrict ways to this id set.
    pub way_ids: Option<BTreeSet<i64>>,
    /// Keep only relations whose `type` value is in this list.
    pub relation_type: Option<Vec<String>>,
    /// Report version, timestamp and changeset per element.
    pub metadata: bool,
    /// Assemble geometries.
    pub geometry: bool,
    /// Split way networks at shared nodes and report segments with source and
    /// target node ids. Requires `ways` and `geometry`.
    pub topology: bool,
}

impl Default for Query {
    fn default() -> Query {
        Query {
            nodes: false,
            ways: false,
            relations: false,
            must_tags: Vec::new(),
            keep: BTreeMap::new(),
            exclude: BTreeMap::new(),
            keep_first: true,
            tags: TagProjection::All,
            node_ids: None,
            way_ids: None,
            relation_type: None,
            metadata: false,
            geometry: false,
            topology: false,
        }
    }
}

fn owned(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(k, vs)| ((*k).to_owned(), vs.iter().map(|v| (*v).to_owned()).collect()))
        .collect()
}

fn keys(list: &[&str]) -> TagProjection {
    TagProjection::Keys(list.iter().map(|s| (*s).to_owned()).collect())
}

impl Query {
    /// The routable road network: ways with a `highway` tag, minus
    /// non-carriageway values, with geometry.
    pub fn highways() -> Query {
        Query {
            ways: true,
            keep: owned(&[("highway", &[])]),
            exclude: owned(&[
                (
                    "highway",
                    &["proposed", "construction", "abandoned", "platform", "raceway"],
                ),
                ("area", &["yes"]),
            ]),
            tags: keys(&[
                "highway", "name", "ref", "oneway", "maxspeed", "lanes", "surface", "bridge",
                "tunnel", "junction", "access",
            ]),
            geometry: true,
            ..Query::default()
        }
    }

    /// Building footprints from ways and multipolygon relations.
    pub fn buildings() -> Query {
        Query {
            ways: true,
            relations: true,
            keep: owned(&[("building", &[])]),
            relation_type: Some(vec!["multipolygon".to_owned()]),
            tags: keys(&[
                "building",
                "name",
                "height",
                "building:levels",
                "addr:street",
                "addr:housenumber",
            ]),
            geometry: true,
            ..Query::default()
        }
    }

    /// Points of interest: nodes and ways carrying an amenity-like key.
    pub fn pois() -> Query {
        Query {
            nodes: true,
            ways: true,
            must_tags: ["amenity", "shop", "tourism", "leisure"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            tags: keys(&[
                "name",
                "amenity",
                "shop",
                "tourism",
                "leisure",
                "opening_hours",
                "website",
                "phone",
            ]),
            geometry: true,
            keep_first: false,
            ..Query::default()
        }
    }

    /// Checks the cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.topology && !(self.ways && self.geometry) {
            return Err(new_error(ErrorKind::InvalidQuery {
                reason: "topology requires ways and geometry",
            }));
        }
        if self.keep_first && !self.exclude.is_empty() && self.keep.is_empty() {
            return Err(new_error(ErrorKind::InvalidQuery {
                reason: "exclude without keep makes no sense in keep-first mode",
            }));
        }
        if !self.keep_first && !self.keep.is_empty() && self.exclude.is_empty() {
            return Err(new_error(ErrorKind::InvalidQuery {
                reason: "keep without exclude makes no sense in exclude-first mode",
            }));
        }
        Ok(())
    }

    /// Every string the query and the area heuristics need mapped to global
    /// string ids.
    pub(crate) fn all_strings(&self) -> HashSet<&str> {
        let mut strings: HashSet<&str> = HashSet::new();
        for (k, vs) in self.keep.iter().chain(self.exclude.iter()) {
            strings.insert(k.as_str());
            strings.extend(vs.iter().map(String::as_str));
        }
        strings.extend(self.must_tags.iter().map(String::as_str));
        if let TagProjection::Keys(keys) = &self.tags {
            strings.extend(keys.iter().map(String::as_str));
        }
        if let Some(types) = &self.relation_type {
            strings.extend(types.iter().map(String::as_str));
        }
        for s in heuristic_strings() {
            strings.insert(s);
        }
        strings
    }

    fn wants_tags(&self) -> bool {
        self.tags != TagProjection::None
            || !self.keep.is_empty()
            || !self.exclude.is_empty()
            || !self.must_tags.is_empty()
            || self.geometry
    }

    /// Lowers the query into the integer string domain of one block, or
    /// returns `None` when the block cannot produce a match.
    ///
    /// `strmap` maps every relevant user string to its global string id.
    pub(crate) fn compile(&self, block: &BlockMeta, strmap: &HashMap<&str, u32>) -> Option<BlockQuery> {
        let has_nodes = !block.nodes.is_empty() || block.dense.is_some();
        if !((self.nodes && has_nodes)
            || (self.ways && !block.ways.is_empty())
            || (self.relations && !block.relations.is_empty()))
        {
            return None;
        }

        // global id -> local id for this block
        let to_local: HashMap<u32, u32> = block
            .strings
            .iter()
            .enumerate()
            .map(|(local, &global)| (global, local as u32))
            .collect();
        let lower = |s: &str| -> Option<u32> {
            strmap.get(s).and_then(|global| to_local.get(global)).copied()
        };

        let must_tags = if self.must_tags.is_empty() {
            None
        } else {
            let mapped: HashSet<u32> = self.must_tags.iter().filter_map(|s| lower(s)).collect();
            if mapped.is_empty() {
                // No element of this block can carry any of the must keys.
                return None;
            }
            Some(mapped)
        };

        let (keep, keep_all) = map_filter(&self.keep, &lower);
        let (excl, excl_all) = map_filter(&self.exclude, &lower);

        if self.keep_first && !self.keep.is_empty() && keep.is_empty() && keep_all.is_empty() {
            // Keep-first with nothing to keep in this block.
            return None;
        }

        let tags = match &self.tags {
            TagProjection::All => None,
            TagProjection::None => Some(HashSet::new()),
            TagProjection::Keys(keys) => {
                Some(keys.iter().filter_map(|s| lower(s)).collect::<HashSet<u32>>())
            }
        };

        let relation_type = self
            .relation_type
            .as_ref()
            .map(|types| types.iter().filter_map(|s| lower(s)).collect::<HashSet<u32>>());

        let area_no = map_area(AREA_NO, &lower);
        let is_area = map_area(IS_AREA, &lower);
        let not_area = map_area(NOT_AREA, &lower);
        let is_area_key_any: HashSet<u32> =
            IS_AREA_KEY_ANY_VALUE.iter().filter_map(|s| lower(s)).collect();
        let is_area_key: HashSet<u32> = IS_AREA
            .iter()
            .chain(NOT_AREA.iter())
            .filter_map(|(k, _)| lower(k))
            .chain(is_area_key_any.iter().copied())
            .collect();
        let area = !is_area.is_empty() || !not_area.is_empty() || !is_area_key.is_empty();
        let rel_area: HashSet<u32> = RELATION_AREA.iter().filter_map(|s| lower(s)).collect();
        let rel_line: HashSet<u32> = RELATION_LINESTRING.iter().filter_map(|s| lower(s)).collect();

        let node_offsets = if !self.nodes {
            Vec::new()
        } else if let Some(ids) = &self.node_ids {
            block.nodes.iter().filter(|n| ids.contains(&n.id)).copied().collect()
        } else {
            block.nodes.clone()
        };
        let way_offsets = if !self.ways {
            Vec::new()
        } else if let Some(ids) = &self.way_ids {
            block.ways.iter().filter(|w| ids.contains(&w.id)).copied().collect()
        } else {
            block.ways.clone()
        };
        let rel_offsets = if self.relations {
            block.relations.clone()
        } else {
            Vec::new()
        };
        let dense = if self.nodes { block.dense } else { None };

        Some(BlockQuery {
            nodes: self.nodes,
            metadata: self.metadata,
            geometry: self.geometry,
            keep_first: self.keep_first,
            get_tags: self.wants_tags(),
            has_filters: !self.keep.is_empty() || !self.exclude.is_empty(),
            node_offsets,
            way_offsets,
            rel_offsets,
            dense,
            node_set: self.node_ids.clone(),
            tags,
            must_tags,
            relation_type,
            keep,
            keep_all,
            excl,
            excl_all,
            area_no,
            is_area,
            not_area,
            is_area_key,
            is_area_key_any,
            area,
            rel_area,
            rel_line,
        })
    }
}

/// Packs a key/value id pair into the 64-bit set domain.
pub(crate) fn pack_tagval(key: u32, value: u32) -> u64 {
    (u64::from(key) << 32) | u64::from(value)
}

fn map_filter(
    filter: &BTreeMap<String, Vec<String>>,
    lower: &impl Fn(&str) -> Option<u32>,
) -> (HashSet<u64>, HashSet<u32>) {
    let mut pairs = HashSet::new();
    let mut key_any = HashSet::new();
    for (k, vs) in filter {
        let Some(key) = lower(k) else { continue };
        if vs.is_empty() {
            key_any.insert(key);
        } else {
            for v in vs {
                if let Some(value) = lower(v) {
                    pairs.insert(pack_tagval(key, value));
                }
            }
        }
    }
    (pairs, key_any)
}

fn map_area(table: &[(&str, &[&str])], lower: &impl Fn(&str) -> Option<u32>) -> HashSet<u64> {
    let mut pairs = HashSet::new();
    for (k, vs) in table {
        let Some(key) = lower(k) else { continue };
        for v in *vs {
            if let Some(value) = lower(v) {
                pairs.insert(pack_tagval(key, value));
            }
        }
    }
    pairs
}

/// A query lowered into one block's local string ids.
#[derive(Debug)]
pub(crate) struct BlockQuery {
    pub nodes: bool,
    pub metadata: bool,
    pub geometry: bool,
    pub keep_first: bool,
    pub get_tags: bool,
    pub has_filters: bool,
    pub node_offsets: Vec<ElementAt>,
    pub way_offsets: Vec<ElementAt>,
    pub rel_offsets: Vec<ElementAt>,
    pub dense: Option<(usize, usize)>,
    pub node_set: Option<BTreeSet<i64>>,
    /// Tag projection: `None` keeps all, an empty set drops all.
    pub tags: Option<HashSet<u32>>,
    pub must_tags: Option<HashSet<u32>>,
    pub relation_type: Option<HashSet<u32>>,
    pub keep: HashSet<u64>,
    pub keep_all: HashSet<u32>,
    pub excl: HashSet<u64>,
    pub excl_all: HashSet<u32>,
    pub area_no: HashSet<u64>,
    pub is_area: HashSet<u64>,
    pub not_area: HashSet<u64>,
    pub is_area_key: HashSet<u32>,
    pub is_area_key_any: HashSet<u32>,
    pub area: bool,
    pub rel_area: HashSet<u32>,
    pub rel_line: HashSet<u32>,
}

impl BlockQuery {
    /// The `must_tags` disjunction: at least one listed key present.
    pub(crate) fn must_ok(&self, keys: &[u32]) -> bool {
        match &self.must_tags {
            None => true,
            Some(must) => keys.iter().any(|k| must.contains(k)),
        }
    }

    /// The keep/exclude verdict for one element's tag list.
    ///
    /// With no keep/exclude in the query every element that survived
    /// `must_tags` passes. Otherwise tagless elements only pass in
    /// exclude-first mode, and tagged elements are judged by the pair and
    /// key-any sets in the order `keep_first` dictates.
    pub(crate) fn accepts_tags(&self, keys: &[u32], vals: &[u32]) -> bool {
        if !self.has_filters {
            return true;
        }
        if keys.is_empty() {
            return !self.keep_first;
        }
        let kps = keys.iter().any(|k| self.keep_all.contains(k))
            || keys
                .iter()
                .zip(vals)
                .any(|(&k, &v)| self.keep.contains(&pack_tagval(k, v)));
        let exs = keys.iter().any(|k| self.excl_all.contains(k))
            || keys
                .iter()
                .zip(vals)
                .any(|(&k, &v)| self.excl.contains(&pack_tagval(k, v)));
        if self.keep_first {
            kps && !exs
        } else {
            !exs || kps
        }
    }

    /// Keeps only the projected tags of an accepted element.
    pub(crate) fn project_tags(&self, keys: Vec<u32>, vals: Vec<u32>) -> (Vec<u32>, Vec<u32>) {
        match &self.tags {
            None => (keys, vals),
            Some(allow) => keys
                .into_iter()
                .zip(vals)
                .filter(|(k, _)| allow.contains(k))
                .unzip(),
        }
    }

    /// The relation `type` allow-list, judged against the tag values.
    pub(crate) fn relation_type_ok(&self, vals: &[u32]) -> bool {
        match &self.relation_type {
            None => true,
            Some(allowed) => vals.iter().any(|v| allowed.contains(v)),
        }
    }
}

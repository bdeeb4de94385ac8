//! Tag tables behind the line/area heuristics.
//!
//! A closed way is only promoted to an area when its tags say so; these
//! tables encode the conventional OSM interpretation. Keys listed in
//! [`IS_AREA_KEY_ANY_VALUE`] make any closed way an area, while the pair
//! tables override that decision for specific values.

/// Key/value pairs that mark a closed way as an area even though the key
/// alone would not.
pub(crate) const IS_AREA: &[(&str, &[&str])] = &[
    ("highway", &["services", "rest_area", "escape", "elevator"]),
    ("railway", &["station", "turntable", "roundhouse", "platform"]),
    ("waterway", &["riverbank", "dock", "boatyard", "fuel"]),
    (
        "aeroway",
        &["aerodrome", "apron", "helipad", "heliport", "terminal"],
    ),
    (
        "natural",
        &[
            "water", "wood", "scrub", "wetland", "grassland", "heath", "rock", "bare_rock",
            "sand", "beach", "scree", "glacier",
        ],
    ),
    ("power", &["plant", "substation", "generator", "transformer"]),
];

/// Key/value pairs that keep a closed way a linestring even though the key
/// alone would promote it.
pub(crate) const NOT_AREA: &[(&str, &[&str])] = &[
    (
        "natural",
        &["coastline", "cliff", "ridge", "arete", "tree_row"],
    ),
    (
        "barrier",
        &["city_wall", "ditch", "hedge", "retaining_wall", "wall", "fence"],
    ),
    ("man_made", &["cutline", "embankment", "pipeline"]),
];

/// Keys whose mere presence makes a closed way an area.
pub(crate) const IS_AREA_KEY_ANY_VALUE: &[&str] = &[
    "area",
    "building",
    "building:part",
    "landuse",
    "amenity",
    "leisure",
    "shop",
    "tourism",
    "boundary",
    "place",
    "golf",
    "indoor",
    "office",
    "public_transport",
    "craft",
    "historic",
    "military",
    "ruins",
];

/// The explicit opt-out: `area=no` keeps a closed way a linestring no
/// matter what the other tags say.
pub(crate) const AREA_NO: &[(&str, &[&str])] = &[("area", &["no"])];

/// Relation `type` values assembled as (multi)polygons.
pub(crate) const RELATION_AREA: &[&str] = &["multipolygon", "boundary"];

/// Relation `type` values assembled as linestrings.
pub(crate) const RELATION_LINESTRING: &[&str] = &["route", "waterway", "network"];

/// Every string the heuristics may need to map into a block dictionary.
pub(crate) fn heuristic_strings() -> impl Iterator<Item = &'static str> {
    IS_AREA
        .iter()
        .chain(NOT_AREA.iter())
        .flat_map(|(k, vs)| std::iter::once(*k).chain(vs.iter().copied()))
        .chain(IS_AREA_KEY_ANY_VALUE.iter().copied())
        .chain(RELATION_AREA.iter().copied())
        .chain(RELATION_LINESTRING.iter().copied())
        .chain(["area", "no"])
}

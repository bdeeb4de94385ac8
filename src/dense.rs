//! Parser for dense-node groups.
//!
//! Dense nodes pack the whole group into parallel delta-coded arrays; tags
//! arrive as one flat key/value id sequence where a zero terminates the
//! current node's list.

use crate::block::BlockMeta;
use crate::codec::{self, WireType};
use crate::error::Result;
use crate::query::BlockQuery;
use crate::records::{BlockRows, ElementInfo, ElementType};

/// Decodes a dense-node group at the recorded span and appends accepted
/// nodes to the block result.
pub(crate) fn parse_dense(
    data: &[u8],
    offset: usize,
    len: usize,
    query: &BlockQuery,
    meta: &BlockMeta,
    out: &mut BlockRows,
) -> Result<()> {
    if !query.nodes {
        return Ok(());
    }

    let end = offset + len;
    let mut ids = Vec::new();
    let mut keys_vals = Vec::new();
    let mut info_span = None;

    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Len) => ids = codec::packed_sint64(data, next, key.len, true)?,
            (5, WireType::Len) if query.metadata => info_span = Some((next, key.len)),
            (10, WireType::Len) if query.get_tags => {
                keys_vals = codec::packed_uint32(data, next, key.len)?;
            }
            _ => {}
        }
        pos = next + key.len;
    }

    let info = if query.metadata {
        Some(match info_span {
            Some((at, len)) => parse_dense_info(data, at, len, meta.date_granularity)?,
            None => DenseInfo::default(),
        })
    } else {
        None
    };

    let mut cursor = 0;
    let mut keys = Vec::new();
    let mut vals = Vec::new();
    for (index, &id) in ids.iter().enumerate() {
        keys.clear();
        vals.clear();
        while cursor + 1 < keys_vals.len() && keys_vals[cursor] != 0 {
            keys.push(keys_vals[cursor]);
            vals.push(keys_vals[cursor + 1]);
            cursor += 2;
        }
        if cursor < keys_vals.len() {
            cursor += 1;
        }

        if let Some(set) = &query.node_set {
            if !set.contains(&id) {
                continue;
            }
        }
        if !query.must_ok(&keys) || !query.accepts_tags(&keys, &vals) {
            continue;
        }
        let info = info.as_ref().map(|i| i.at(index));
        let (keys, vals) = query.project_tags(keys.clone(), vals.clone());
        out.push_element(id, ElementType::Node, info, &keys, &vals, &meta.strings);
    }
    Ok(())
}

/// The delta-coded metadata arrays of a dense group.
#[derive(Default)]
struct DenseInfo {
    versions: Vec<i32>,
    timestamps: Vec<i64>,
    changesets: Vec<i64>,
}

impl DenseInfo {
    fn at(&self, index: usize) -> ElementInfo {
        ElementInfo {
            version: self.versions.get(index).copied().unwrap_or(-1),
            timestamp: self.timestamps.get(index).copied().unwrap_or(0),
            changeset: self.changesets.get(index).copied().unwrap_or(0),
        }
    }
}

fn parse_dense_info(data: &[u8], offset: usize, len: usize, date_granularity: i32) -> Result<DenseInfo> {
    let end = offset + len;
    let mut info = DenseInfo {
        versions: Vec::new(),
        timestamps: Vec::new(),
        changesets: Vec::new(),
    };
    let mut pos = offset;
    while pos < end {
        let (key, next) = codec::key(data, pos)?;
        match (key.field, key.wire) {
            (1, WireType::Len) => info.versions = codec::packed_int32(data, next, key.len)?,
            (2, WireType::Len) => {
                info.timestamps = codec::packed_sint64(data, next, key.len, true)?;
                for t in &mut info.timestamps {
                    *t *= i64::from(date_granularity);
                }
            }
            (3, WireType::Len) => {
                info.changesets = codec::packed_sint64(data, next, key.len, true)?;
            }
            _ => {}
        }
        pos = next + key.len;
    }
    Ok(info)
}

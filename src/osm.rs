//! The [`Osm`] handle: two-pass file indexing, the coordinate and string
//! caches, and the query driver.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;
use rayon::prelude::*;

use crate::blob::{self, BlobType, MAX_BLOB_HEADER_SIZE, MAX_BLOB_MESSAGE_SIZE};
use crate::block::{scan_block, BlockMeta};
use crate::dense::parse_dense;
use crate::error::{new_error, ErrorKind, Result};
use crate::frame::{self, Frame};
use crate::primitives::{parse_node, parse_relation, parse_way};
use crate::query::{BlockQuery, Query, TagProjection};
use crate::records::{merge, BlockRows, ElementType};

/// The file-wide node coordinate cache, sorted by node id for binary search.
/// Coordinates are WGS84 degrees stored as `f32` (a nanodegree is around a
/// tenth of a millimeter, far below `f32` resolution at street scale).
#[derive(Debug)]
pub(crate) struct CoordCache {
    ids: Vec<i64>,
    coords: Vec<[f32; 2]>,
}

impl CoordCache {
    fn build(mut points: Vec<(i64, i64, i64)>) -> CoordCache {
        points.sort_by_key(|p| p.0);
        let ids = points.iter().map(|p| p.0).collect();
        let coords = points
            .iter()
            .map(|&(_, lon, lat)| [(lon as f64 * 1e-9) as f32, (lat as f64 * 1e-9) as f32])
            .collect();
        CoordCache { ids, coords }
    }

    pub(crate) fn get(&self, id: i64) -> Option<[f32; 2]> {
        self.ids.binary_search(&id).ok().map(|i| self.coords[i])
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    /// The id column is non-decreasing by construction.
    #[cfg(test)]
    pub(crate) fn is_sorted(&self) -> bool {
        self.ids.windows(2).all(|w| w[0] <= w[1])
    }
}

#[derive(Debug)]
enum Source {
    File(PathBuf),
    Mmap(memmap2::Mmap),
}

enum SpanReader<'a> {
    File(File),
    Mmap(&'a [u8]),
}

impl SpanReader<'_> {
    fn read(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        match self {
            SpanReader::File(file) => {
                file.seek(SeekFrom::Start(start))?;
                let mut buf = vec![0u8; (end - start) as usize];
                file.read_exact(&mut buf)?;
                Ok(buf)
            }
            SpanReader::Mmap(data) => data
                .get(start as usize..end as usize)
                .map(|s| s.to_vec())
                .ok_or_else(|| new_error(ErrorKind::Truncated { offset: start })),
        }
    }
}

/// Cache usage summary, printable for a quick look at an opened file.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub blocks: usize,
    pub dense_blocks: usize,
    pub node_blocks: usize,
    pub way_blocks: usize,
    pub relation_blocks: usize,
    pub points: usize,
    pub strings: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} blocks: {} dense nodes, {} nodes, {} ways, {} relations",
            self.blocks, self.dense_blocks, self.node_blocks, self.way_blocks, self.relation_blocks
        )?;
        write!(f, "{} cached points, {} strings", self.points, self.strings)
    }
}

/// An opened `*.osm.pbf` file with its block index and caches.
///
/// Opening walks the whole file once, recording where every element lives
/// and extracting all node coordinates; each [`query`](Osm::query) then
/// re-reads only the blocks its compiled predicate cannot rule out.
///
/// ```no_run
/// use osmdata::{Osm, Query};
///
/// # fn main() -> osmdata::Result<()> {
/// let osm = Osm::open("monaco.osm.pbf")?;
/// let frame = osm.query(&Query::highways())?;
/// println!("{} highway rows", frame.ids.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Osm {
    source: Source,
    blocks: Vec<BlockMeta>,
    strings: Vec<String>,
    string_index: HashMap<String, u32>,
    coords: CoordCache,
    required_features: Vec<String>,
    optional_features: Vec<String>,
}

impl Osm {
    /// Opens and indexes a PBF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Osm> {
        Osm::load(path.as_ref(), false)
    }

    /// Opens and indexes a PBF file, serving query re-reads from a memory
    /// map instead of seeks.
    pub fn open_mmap<P: AsRef<Path>>(path: P) -> Result<Osm> {
        Osm::load(path.as_ref(), true)
    }

    fn load(path: &Path, use_mmap: bool) -> Result<Osm> {
        if path.extension().map_or(true, |ext| ext != "pbf") {
            return Err(new_error(ErrorKind::NotPbf {
                path: path.to_owned(),
            }));
        }

        let file = File::open(path)?;
        let source = if use_mmap {
            // Safety: the map is only read, and the file is expected to stay
            // unmodified while the Osm value is alive.
            Source::Mmap(unsafe { memmap2::Mmap::map(&file)? })
        } else {
            Source::File(path.to_owned())
        };

        let mut reader = BufReader::new(file);
        let mut cursor = 0u64;
        let mut scans = Vec::new();
        let mut points = Vec::new();
        let mut required_features = Vec::new();
        let mut optional_features = Vec::new();

        while let Some(header_len) = blob::read_header_len(&mut reader, cursor)? {
            cursor += 4;
            let header_len = u64::from(header_len);
            if header_len > MAX_BLOB_HEADER_SIZE {
                return Err(new_error(ErrorKind::BlobTooBig { size: header_len }));
            }
            let head_buf = blob::read_message(&mut reader, header_len, cursor)?;
            cursor += header_len;
            let head = blob::parse_blob_head(&head_buf)?;
            if head.datasize > MAX_BLOB_MESSAGE_SIZE {
                return Err(new_error(ErrorKind::BlobTooBig {
                    size: head.datasize,
                }));
            }
            let blob_buf = blob::read_message(&mut reader, head.datasize, cursor)?;
            let blob_start = cursor;
            cursor += head.datasize;

            match head.blob_type {
                BlobType::OsmHeader => {
                    let body = blob::parse_blob(&blob_buf)?;
                    let data =
                        blob::decompress(&blob_buf[body.payload], body.compression, body.raw_size)?;
                    let header = blob::parse_header_block(&data)?;
                    required_features = header.required_features;
                    optional_features = header.optional_features;
                }
                BlobType::OsmData => {
                    let body = blob::parse_blob(&blob_buf)?;
                    let start = blob_start + body.payload.start as u64;
                    let end = blob_start + body.payload.end as u64;
                    let data =
                        blob::decompress(&blob_buf[body.payload], body.compression, body.raw_size)?;
                    let mut scan = scan_block(&data)?;
                    points.append(&mut scan.points);
                    scans.push((start, end, body.compression, body.raw_size, scan));
                }
                BlobType::Unknown(_) => {}
            }
        }

        // Union all block string tables into the global dictionary and turn
        // each table into a local-to-global id map.
        let mut strings: Vec<String> = Vec::new();
        let mut string_index: HashMap<String, u32> = HashMap::new();
        let mut blocks = Vec::with_capacity(scans.len());
        for (start, end, compression, raw_size, scan) in scans {
            let locals = scan
                .strings
                .into_iter()
                .map(|s| match string_index.entry(s) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let global = strings.len() as u32;
                        strings.push(entry.key().clone());
                        entry.insert(global);
                        global
                    }
                })
                .collect();
            blocks.push(BlockMeta {
                start,
                end,
                compression,
                raw_size,
                strings: locals,
                date_granularity: scan.date_granularity,
                dense: scan.dense,
                nodes: scan.nodes,
                ways: scan.ways,
                relations: scan.relations,
            });
        }

        debug!(
            "indexed {}: {} blocks, {} points, {} strings",
            path.display(),
            blocks.len(),
            points.len(),
            strings.len()
        );

        Ok(Osm {
            source,
            blocks,
            strings,
            string_index,
            coords: CoordCache::build(points),
            required_features,
            optional_features,
        })
    }

    /// The global string table; tag and role ids index into it.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Looks up one global string id.
    pub fn string(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Looks up the WGS84 lon/lat of a node id.
    pub fn coord(&self, id: i64) -> Option<[f32; 2]> {
        self.coords.get(id)
    }

    /// Bulk coordinate lookup, position-aligned with `ids`.
    pub fn coords(&self, ids: &[i64]) -> Vec<Option<[f32; 2]>> {
        ids.iter().map(|&id| self.coords.get(id)).collect()
    }

    /// Features the file declares as required.
    pub fn required_features(&self) -> &[String] {
        &self.required_features
    }

    /// Features the file declares as optional.
    pub fn optional_features(&self) -> &[String] {
        &self.optional_features
    }

    /// Summarizes the cached index.
    pub fn stats(&self) -> Stats {
        Stats {
            blocks: self.blocks.len(),
            dense_blocks: self.blocks.iter().filter(|b| b.dense.is_some()).count(),
            node_blocks: self.blocks.iter().filter(|b| !b.nodes.is_empty()).count(),
            way_blocks: self.blocks.iter().filter(|b| !b.ways.is_empty()).count(),
            relation_blocks: self
                .blocks
                .iter()
                .filter(|b| !b.relations.is_empty())
                .count(),
            points: self.coords.len(),
            strings: self.strings.len(),
        }
    }

    /// Runs a query against the indexed file.
    ///
    /// The call is pure over the immutable index: identical queries produce
    /// identical frames.
    pub fn query(&self, query: &Query) -> Result<Frame> {
        query.validate()?;
        let rows = self.run(query)?;

        // Relations queried with geometry need their member ways expanded;
        // one level only, super-relations are not chased.
        let ways = if query.relations && query.geometry {
            let way_ids: BTreeSet<i64> = rows
                .members
                .iter()
                .filter(|m| m.member_type == ElementType::Way)
                .map(|m| m.member_id)
                .collect();
            if way_ids.is_empty() {
                None
            } else {
                Some(self.expand_ways(way_ids)?)
            }
        } else {
            None
        };

        Ok(frame::build(query, rows, ways, &self.strings, &self.coords))
    }

    /// Compiles the query per block, reads the surviving blocks under one
    /// scoped handle, and decodes them in parallel in block order.
    fn run(&self, query: &Query) -> Result<BlockRows> {
        let all_strings = query.all_strings();
        let strmap: HashMap<&str, u32> = all_strings
            .into_iter()
            .filter_map(|s| self.string_index.get(s).map(|&g| (s, g)))
            .collect();

        let mut jobs: Vec<(&BlockMeta, BlockQuery, Vec<u8>)> = Vec::new();
        {
            let mut reader = match &self.source {
                Source::File(path) => SpanReader::File(File::open(path)?),
                Source::Mmap(map) => SpanReader::Mmap(&map[..]),
            };
            for meta in &self.blocks {
                if let Some(compiled) = query.compile(meta, &strmap) {
                    let raw = reader.read(meta.start, meta.end)?;
                    jobs.push((meta, compiled, raw));
                }
            }
        }
        debug!("query matches {} of {} blocks", jobs.len(), self.blocks.len());

        let blocks: Result<Vec<BlockRows>> = jobs
            .into_par_iter()
            .map(|(meta, compiled, raw)| {
                let data = blob::decompress(&raw, meta.compression, meta.raw_size)?;
                parse_block(&data, &compiled, meta)
            })
            .collect();
        Ok(merge(blocks?))
    }

    /// The secondary ways-only query behind relation geometry: fetches the
    /// ordered node lists of the referenced ways.
    fn expand_ways(&self, way_ids: BTreeSet<i64>) -> Result<HashMap<i64, Vec<i64>>> {
        let sub = Query {
            ways: true,
            way_ids: Some(way_ids),
            tags: TagProjection::None,
            geometry: true,
            keep_first: false,
            ..Query::default()
        };
        let rows = self.run(&sub)?;
        let mut ways: HashMap<i64, Vec<i64>> = HashMap::new();
        for member in &rows.members {
            ways.entry(rows.ids[member.row].osm_id)
                .or_default()
                .push(member.member_id);
        }
        Ok(ways)
    }
}

/// Decodes the elements a compiled query selected from one block.
fn parse_block(data: &[u8], query: &BlockQuery, meta: &BlockMeta) -> Result<BlockRows> {
    let mut rows = BlockRows::default();
    for at in &query.node_offsets {
        parse_node(data, *at, query, meta, &mut rows)?;
    }
    for at in &query.way_offsets {
        parse_way(data, *at, query, meta, &mut rows)?;
    }
    for at in &query.rel_offsets {
        parse_relation(data, *at, query, meta, &mut rows)?;
    }
    if let Some((offset, len)) = query.dense {
        parse_dense(data, offset, len, query, meta, &mut rows)?;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_cache_sorts_and_finds() {
        let cache = CoordCache::build(vec![
            (30, 3_000_000_000, 1_000_000_000),
            (10, 1_000_000_000, 2_000_000_000),
            (20, -2_000_000_000, 500_000_000),
        ]);
        assert!(cache.is_sorted());
        assert_eq!(cache.get(10), Some([1.0, 2.0]));
        assert_eq!(cache.get(20), Some([-2.0, 0.5]));
        assert_eq!(cache.get(30), Some([3.0, 1.0]));
        assert_eq!(cache.get(40), None);
    }
}

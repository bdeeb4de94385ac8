use assert_approx_eq::assert_approx_eq;
use osmdata::*;

/// Builds synthetic PBF files for the tests below: a minimal protobuf wire
/// encoder plus a block builder that mirrors what real writers emit
/// (granularity left at its default of 100).
mod pbf {
    use std::io::Write;

    pub fn uvarint(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                return;
            }
            out.push(byte | 0x80);
        }
    }

    pub fn svarint(v: i64, out: &mut Vec<u8>) {
        uvarint(((v << 1) ^ (v >> 63)) as u64, out);
    }

    pub fn field_varint(field: u32, v: u64, out: &mut Vec<u8>) {
        uvarint(u64::from(field) << 3, out);
        uvarint(v, out);
    }

    pub fn field_bytes(field: u32, bytes: &[u8], out: &mut Vec<u8>) {
        uvarint((u64::from(field) << 3) | 2, out);
        uvarint(bytes.len() as u64, out);
        out.extend_from_slice(bytes);
    }

    fn packed_uvarint(field: u32, values: &[u32], out: &mut Vec<u8>) {
        let mut payload = Vec::new();
        for &v in values {
            uvarint(u64::from(v), &mut payload);
        }
        field_bytes(field, &payload, out);
    }

    fn packed_svarint_delta(field: u32, values: &[i64], out: &mut Vec<u8>) {
        let mut payload = Vec::new();
        let mut prev = 0;
        for &v in values {
            svarint(v - prev, &mut payload);
            prev = v;
        }
        field_bytes(field, &payload, out);
    }

    /// Degrees to raw units at the default granularity of 100.
    fn raw(deg: f64) -> i64 {
        (deg * 1e7).round() as i64
    }

    #[derive(Default)]
    pub struct BlockBuilder {
        strings: Vec<String>,
        group: Vec<u8>,
    }

    impl BlockBuilder {
        pub fn new() -> BlockBuilder {
            BlockBuilder {
                // index zero is reserved for the empty string
                strings: vec![String::new()],
                group: Vec::new(),
            }
        }

        fn intern(&mut self, s: &str) -> u32 {
            if let Some(i) = self.strings.iter().position(|x| x == s) {
                return i as u32;
            }
            self.strings.push(s.to_owned());
            (self.strings.len() - 1) as u32
        }

        fn tag_fields(&mut self, tags: &[(&str, &str)], msg: &mut Vec<u8>) {
            if tags.is_empty() {
                return;
            }
            let keys: Vec<u32> = tags.iter().map(|(k, _)| self.intern(k)).collect();
            let vals: Vec<u32> = tags.iter().map(|(_, v)| self.intern(v)).collect();
            packed_uvarint(2, &keys, msg);
            packed_uvarint(3, &vals, msg);
        }

        pub fn node(&mut self, id: i64, lon: f64, lat: f64, tags: &[(&str, &str)]) {
            let mut msg = Vec::new();
            let mut buf = Vec::new();
            svarint(id, &mut buf);
            field_bytes_raw(1, &buf, &mut msg);
            self.tag_fields(tags, &mut msg);
            let mut buf = Vec::new();
            svarint(raw(lat), &mut buf);
            field_bytes_raw(8, &buf, &mut msg);
            let mut buf = Vec::new();
            svarint(raw(lon), &mut buf);
            field_bytes_raw(9, &buf, &mut msg);
            field_bytes(1, &msg, &mut self.group);
        }

        pub fn node_with_info(
            &mut self,
            id: i64,
            lon: f64,
            lat: f64,
            tags: &[(&str, &str)],
            version: i32,
            timestamp: i64,
            changeset: i64,
        ) {
            let mut info = Vec::new();
            field_varint(1, version as u64, &mut info);
            field_varint(2, timestamp as u64, &mut info);
            field_varint(3, changeset as u64, &mut info);

            let mut msg = Vec::new();
            let mut buf = Vec::new();
            svarint(id, &mut buf);
            field_bytes_raw(1, &buf, &mut msg);
            self.tag_fields(tags, &mut msg);
            field_bytes(4, &info, &mut msg);
            let mut buf = Vec::new();
            svarint(raw(lat), &mut buf);
            field_bytes_raw(8, &buf, &mut msg);
            let mut buf = Vec::new();
            svarint(raw(lon), &mut buf);
            field_bytes_raw(9, &buf, &mut msg);
            field_bytes(1, &msg, &mut self.group);
        }

        pub fn dense(&mut self, nodes: &[(i64, f64, f64)]) {
            let ids: Vec<i64> = nodes.iter().map(|n| n.0).collect();
            let lats: Vec<i64> = nodes.iter().map(|n| raw(n.2)).collect();
            let lons: Vec<i64> = nodes.iter().map(|n| raw(n.1)).collect();
            let mut msg = Vec::new();
            packed_svarint_delta(1, &ids, &mut msg);
            packed_svarint_delta(8, &lats, &mut msg);
            packed_svarint_delta(9, &lons, &mut msg);
            field_bytes(2, &msg, &mut self.group);
        }

        pub fn dense_tagged(&mut self, nodes: &[(i64, f64, f64, Vec<(&str, &str)>)]) {
            let ids: Vec<i64> = nodes.iter().map(|n| n.0).collect();
            let lats: Vec<i64> = nodes.iter().map(|n| raw(n.2)).collect();
            let lons: Vec<i64> = nodes.iter().map(|n| raw(n.1)).collect();
            let mut keys_vals = Vec::new();
            for (_, _, _, tags) in nodes {
                for (k, v) in tags {
                    keys_vals.push(self.intern(k));
                    keys_vals.push(self.intern(v));
                }
                keys_vals.push(0);
            }
            let mut msg = Vec::new();
            packed_svarint_delta(1, &ids, &mut msg);
            packed_svarint_delta(8, &lats, &mut msg);
            packed_svarint_delta(9, &lons, &mut msg);
            packed_uvarint(10, &keys_vals, &mut msg);
            field_bytes(2, &msg, &mut self.group);
        }

        pub fn way(&mut self, id: i64, refs: &[i64], tags: &[(&str, &str)]) {
            let mut msg = Vec::new();
            field_varint(1, id as u64, &mut msg);
            self.tag_fields(tags, &mut msg);
            packed_svarint_delta(8, refs, &mut msg);
            field_bytes(3, &msg, &mut self.group);
        }

        /// Member type codes: 0 node, 1 way, 2 relation.
        pub fn relation(&mut self, id: i64, members: &[(i64, u32, &str)], tags: &[(&str, &str)]) {
            let roles: Vec<u32> = members.iter().map(|m| self.intern(m.2)).collect();
            let member_ids: Vec<i64> = members.iter().map(|m| m.0).collect();
            let types: Vec<u32> = members.iter().map(|m| m.1).collect();
            let mut msg = Vec::new();
            field_varint(1, id as u64, &mut msg);
            self.tag_fields(tags, &mut msg);
            packed_uvarint(8, &roles, &mut msg);
            packed_svarint_delta(9, &member_ids, &mut msg);
            packed_uvarint(10, &types, &mut msg);
            field_bytes(4, &msg, &mut self.group);
        }

        /// Encodes the block message: string table, then the primitive group.
        pub fn build(&self) -> Vec<u8> {
            let mut table = Vec::new();
            for s in &self.strings {
                field_bytes(1, s.as_bytes(), &mut table);
            }
            let mut block = Vec::new();
            field_bytes(1, &table, &mut block);
            field_bytes(2, &self.group, &mut block);
            block
        }
    }

    // field_bytes for pre-encoded varint payloads of scalar fields
    fn field_bytes_raw(field: u32, payload: &[u8], out: &mut Vec<u8>) {
        uvarint(u64::from(field) << 3, out);
        out.extend_from_slice(payload);
    }

    fn blob(blob_type: &str, content: &[u8], zlib: bool) -> Vec<u8> {
        let mut blob_msg = Vec::new();
        if zlib {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(content).unwrap();
            let compressed = encoder.finish().unwrap();
            field_varint(2, content.len() as u64, &mut blob_msg);
            field_bytes(3, &compressed, &mut blob_msg);
        } else {
            field_bytes(1, content, &mut blob_msg);
        }

        let mut header = Vec::new();
        field_bytes(1, blob_type.as_bytes(), &mut header);
        field_varint(3, blob_msg.len() as u64, &mut header);

        let mut framed = Vec::new();
        framed.extend_from_slice(&(header.len() as u32).to_be_bytes());
        framed.extend_from_slice(&header);
        framed.extend_from_slice(&blob_msg);
        framed
    }

    pub fn header_block(features: &[&str]) -> Vec<u8> {
        let mut content = Vec::new();
        for f in features {
            field_bytes(4, f.as_bytes(), &mut content);
        }
        content
    }

    pub fn file_with(features: &[&str], blocks: &[Vec<u8>], zlib: bool) -> Vec<u8> {
        let mut bytes = blob("OSMHeader", &header_block(features), zlib);
        for block in blocks {
            bytes.extend_from_slice(&blob("OSMData", block, zlib));
        }
        bytes
    }

    pub fn file(blocks: &[Vec<u8>]) -> Vec<u8> {
        file_with(&["OsmSchema-V0.6", "DenseNodes"], blocks, false)
    }

    pub fn lzma_file() -> Vec<u8> {
        let mut blob_msg = Vec::new();
        field_bytes(4, &[0u8], &mut blob_msg);
        let mut header = Vec::new();
        field_bytes(1, b"OSMData", &mut header);
        field_varint(3, blob_msg.len() as u64, &mut header);
        let mut bytes = blob("OSMHeader", &header_block(&["OsmSchema-V0.6"]), false);
        bytes.extend_from_slice(&(header.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&blob_msg);
        bytes
    }
}

fn write_pbf(name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("osmdata-test-{name}-{}.pbf", std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    path
}

fn keep(key: &str, values: &[&str]) -> std::collections::BTreeMap<String, Vec<String>> {
    [(key.to_owned(), values.iter().map(|v| (*v).to_owned()).collect())].into()
}

fn tag_strings(osm: &Osm, frame: &Frame, row: usize) -> Vec<(String, String)> {
    frame
        .tags
        .iter()
        .filter(|t| t.row == row)
        .map(|t| {
            (
                osm.string(t.key).unwrap().to_owned(),
                osm.string(t.value).unwrap().to_owned(),
            )
        })
        .collect()
}

#[test]
fn highway_extraction() {
    let mut block = pbf::BlockBuilder::new();
    block.dense(&[
        (1, 11.0, 48.0),
        (2, 11.1, 48.1),
        (3, 11.2, 48.2),
        (4, 11.3, 48.3),
        (5, 11.4, 48.4),
    ]);
    block.way(10, &[1, 2, 3, 4, 5], &[("highway", "residential")]);
    let path = write_pbf("highway", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            ways: true,
            keep: keep("highway", &[]),
            geometry: true,
            ..Query::default()
        })
        .unwrap();

    assert_eq!(frame.ids.len(), 1);
    assert_eq!(frame.ids[0].osm_id, 10);
    assert_eq!(frame.ids[0].osm_type, ElementType::Way);
    assert_eq!(
        tag_strings(&osm, &frame, 0),
        vec![("highway".to_owned(), "residential".to_owned())]
    );

    match &frame.geometries[0] {
        Some(Geometry::LineString(points)) => {
            assert_eq!(points.len(), 5);
            assert_approx_eq!(points[0][0], 11.0f32, 1e-5);
            assert_approx_eq!(points[0][1], 48.0f32, 1e-5);
            assert_approx_eq!(points[4][0], 11.4f32, 1e-5);
            assert_approx_eq!(points[4][1], 48.4f32, 1e-5);
        }
        other => panic!("expected a linestring, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}

#[test]
fn must_tags_filter_nodes() {
    let mut block = pbf::BlockBuilder::new();
    block.node(1, 1.0, 1.0, &[("amenity", "cafe")]);
    block.node(2, 2.0, 2.0, &[("name", "somewhere")]);
    block.node(3, 3.0, 3.0, &[]);
    let path = write_pbf("musttags", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            nodes: true,
            must_tags: vec!["amenity".to_owned()],
            ..Query::default()
        })
        .unwrap();

    assert_eq!(frame.ids.len(), 1);
    assert_eq!(frame.ids[0].osm_id, 1);
    assert_eq!(frame.ids[0].osm_type, ElementType::Node);

    std::fs::remove_file(path).ok();
}

#[test]
fn keep_first_vs_exclude_first() {
    let mut block = pbf::BlockBuilder::new();
    block.node(1, 1.0, 1.0, &[("shop", "bakery"), ("disused", "yes")]);
    let path = write_pbf("keepfirst", &pbf::file(&[block.build()]));
    let osm = Osm::open(&path).unwrap();

    let query = Query {
        nodes: true,
        keep: keep("shop", &[]),
        exclude: keep("disused", &["yes"]),
        keep_first: true,
        ..Query::default()
    };
    assert_eq!(osm.query(&query).unwrap().ids.len(), 0);

    let query = Query {
        keep_first: false,
        ..query
    };
    assert_eq!(osm.query(&query).unwrap().ids.len(), 1);

    std::fs::remove_file(path).ok();
}

#[test]
fn closed_way_area_heuristic() {
    let ring = [1i64, 2, 3, 4, 1];
    let mut block = pbf::BlockBuilder::new();
    block.dense(&[
        (1, 0.0, 0.0),
        (2, 0.0, 1.0),
        (3, 1.0, 1.0),
        (4, 1.0, 0.0),
    ]);
    block.way(20, &ring, &[("building", "yes")]);
    block.way(21, &ring, &[("highway", "footway")]);
    block.way(22, &ring, &[("building", "yes"), ("area", "no")]);
    let path = write_pbf("areas", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            ways: true,
            geometry: true,
            keep_first: false,
            ..Query::default()
        })
        .unwrap();

    assert_eq!(frame.ids.len(), 3);
    let geom_class = |row: usize| {
        frame
            .members
            .iter()
            .find(|m| m.row == row)
            .map(|m| m.geom)
            .unwrap()
    };
    assert_eq!(geom_class(0), GeomClass::Area);
    assert_eq!(geom_class(1), GeomClass::Line);
    assert_eq!(geom_class(2), GeomClass::Line);

    assert!(matches!(frame.geometries[0], Some(Geometry::Polygon(_))));
    assert!(matches!(frame.geometries[1], Some(Geometry::LineString(_))));
    assert!(matches!(frame.geometries[2], Some(Geometry::LineString(_))));

    std::fs::remove_file(path).ok();
}

#[test]
fn multipolygon_with_reversed_inner() {
    let mut block = pbf::BlockBuilder::new();
    block.dense(&[
        (1, 0.0, 0.0),
        (2, 0.0, 3.0),
        (3, 3.0, 3.0),
        (4, 3.0, 0.0),
        (5, 1.0, 1.0),
        (6, 1.0, 2.0),
        (7, 2.0, 2.0),
    ]);
    block.way(10, &[1, 2, 3, 4, 1], &[]);
    block.way(11, &[5, 6, 7], &[]);
    block.relation(
        100,
        &[(10, 1, "outer"), (11, 1, "inner")],
        &[("type", "multipolygon")],
    );
    let path = write_pbf("multipolygon", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            ways: true,
            relations: true,
            geometry: true,
            keep_first: false,
            ..Query::default()
        })
        .unwrap();

    // The member ways are absorbed into the relation geometry.
    assert_eq!(frame.ids.len(), 1);
    assert_eq!(frame.ids[0].osm_id, 100);
    assert_eq!(frame.ids[0].osm_type, ElementType::Relation);

    match &frame.geometries[0] {
        Some(Geometry::Polygon(rings)) => {
            assert_eq!(rings.len(), 2);
            // outer ring: the closed way, 5 points
            assert_eq!(rings[0].len(), 5);
            assert_eq!(rings[0].first(), rings[0].last());
            // inner ring: the open triangle, closed by the assembler
            assert_eq!(rings[1].len(), 4);
            assert_eq!(rings[1].first(), rings[1].last());
            assert_approx_eq!(rings[1][0][0], 1.0f32, 1e-5);
            assert_approx_eq!(rings[1][0][1], 1.0f32, 1e-5);
        }
        other => panic!("expected a polygon, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}

#[test]
fn topology_splits_at_shared_node() {
    let n = 100i64;
    let mut block = pbf::BlockBuilder::new();
    block.dense(&[
        (1, 0.0, 0.0),
        (2, 0.1, 0.0),
        (3, 0.3, 0.0),
        (4, 0.4, 0.0),
        (5, 0.0, 1.0),
        (6, 0.1, 1.0),
        (7, 0.3, 1.0),
        (8, 0.4, 1.0),
        (n, 0.2, 0.5),
    ]);
    block.way(30, &[1, 2, n, 3, 4], &[]);
    block.way(31, &[5, 6, n, 7, 8], &[]);
    let path = write_pbf("topology", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            ways: true,
            geometry: true,
            topology: true,
            keep_first: false,
            ..Query::default()
        })
        .unwrap();

    assert_eq!(frame.ids.len(), 2);
    let endpoints: Vec<(usize, i64, i64)> = frame
        .segments
        .iter()
        .map(|s| (s.row, s.source, s.target))
        .collect();
    assert_eq!(
        endpoints,
        vec![(0, 1, n), (0, n, 4), (1, 5, n), (1, n, 8)]
    );
    for segment in &frame.segments {
        assert_eq!(segment.points.len(), 3);
    }

    std::fs::remove_file(path).ok();
}

#[test]
fn dense_tags_filter() {
    let mut block = pbf::BlockBuilder::new();
    block.dense_tagged(&[
        (1, 1.0, 1.0, vec![("amenity", "cafe")]),
        (2, 2.0, 2.0, vec![]),
        (3, 3.0, 3.0, vec![("amenity", "bench"), ("backrest", "yes")]),
    ]);
    let path = write_pbf("dense", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            nodes: true,
            must_tags: vec!["amenity".to_owned()],
            ..Query::default()
        })
        .unwrap();

    assert_eq!(frame.ids.len(), 2);
    assert_eq!(frame.ids[0].osm_id, 1);
    assert_eq!(frame.ids[1].osm_id, 3);
    assert_eq!(tag_strings(&osm, &frame, 1).len(), 2);

    std::fs::remove_file(path).ok();
}

#[test]
fn node_metadata_is_scaled_to_milliseconds() {
    let mut block = pbf::BlockBuilder::new();
    block.node_with_info(7, 1.0, 2.0, &[("amenity", "cafe")], 3, 1234, 42);
    let path = write_pbf("metadata", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            nodes: true,
            metadata: true,
            keep_first: false,
            ..Query::default()
        })
        .unwrap();

    assert_eq!(frame.ids.len(), 1);
    let info = frame.ids[0].info.unwrap();
    assert_eq!(info.version, 3);
    // default date granularity is 100 ms
    assert_eq!(info.timestamp, 123_400);
    assert_eq!(info.changeset, 42);

    std::fs::remove_file(path).ok();
}

#[test]
fn node_id_subset() {
    let mut block = pbf::BlockBuilder::new();
    block.dense(&[(1, 1.0, 1.0), (2, 2.0, 2.0), (3, 3.0, 3.0)]);
    let path = write_pbf("idsubset", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            nodes: true,
            node_ids: Some([1i64, 3].into()),
            keep_first: false,
            geometry: true,
            ..Query::default()
        })
        .unwrap();

    let ids: Vec<i64> = frame.ids.iter().map(|i| i.osm_id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert!(matches!(frame.geometries[0], Some(Geometry::Point(_))));

    std::fs::remove_file(path).ok();
}

#[test]
fn zlib_blocks_decode() {
    let mut block = pbf::BlockBuilder::new();
    block.node(1, 11.625, 52.12, &[("amenity", "cafe")]);
    let bytes = pbf::file_with(&["OsmSchema-V0.6"], &[block.build()], true);
    let path = write_pbf("zlib", &bytes);

    let osm = Osm::open(&path).unwrap();
    let frame = osm
        .query(&Query {
            nodes: true,
            keep_first: false,
            geometry: true,
            ..Query::default()
        })
        .unwrap();
    assert_eq!(frame.ids.len(), 1);
    match frame.geometries[0] {
        Some(Geometry::Point([lon, lat])) => {
            assert_approx_eq!(lon, 11.625f32, 1e-5);
            assert_approx_eq!(lat, 52.12f32, 1e-5);
        }
        ref other => panic!("expected a point, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}

#[test]
fn query_is_idempotent() {
    let mut block = pbf::BlockBuilder::new();
    block.dense(&[(1, 1.0, 1.0), (2, 2.0, 2.0)]);
    block.way(10, &[1, 2], &[("highway", "path")]);
    let path = write_pbf("idempotent", &pbf::file(&[block.build()]));

    let osm = Osm::open(&path).unwrap();
    let query = Query {
        ways: true,
        keep: keep("highway", &[]),
        geometry: true,
        metadata: true,
        ..Query::default()
    };
    let first = osm.query(&query).unwrap();
    let second = osm.query(&query).unwrap();
    assert_eq!(first, second);

    std::fs::remove_file(path).ok();
}

#[test]
fn mmap_and_file_backed_agree() {
    let mut block = pbf::BlockBuilder::new();
    block.dense(&[(1, 1.0, 1.0), (2, 2.0, 2.0)]);
    block.way(10, &[1, 2], &[("highway", "path")]);
    let path = write_pbf("mmap", &pbf::file(&[block.build()]));

    let query = Query {
        ways: true,
        geometry: true,
        keep_first: false,
        ..Query::default()
    };
    let from_file = Osm::open(&path).unwrap().query(&query).unwrap();
    let from_mmap = Osm::open_mmap(&path).unwrap().query(&query).unwrap();
    assert_eq!(from_file, from_mmap);

    std::fs::remove_file(path).ok();
}

#[test]
fn rejects_wrong_extension() {
    let err = Osm::open("somewhere/region.osm.xml").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotPbf { .. }));
}

#[test]
fn rejects_unknown_required_feature() {
    let bytes = pbf::file_with(
        &["OsmSchema-V0.6", "HistoricalInformation"],
        &[],
        false,
    );
    let path = write_pbf("features", &bytes);
    let err = Osm::open(&path).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnsupportedFeature { .. }));
    std::fs::remove_file(path).ok();
}

#[test]
fn rejects_unsupported_compression() {
    let path = write_pbf("lzma", &pbf::lzma_file());
    let err = Osm::open(&path).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::UnsupportedCompression { format: "lzma" }
    ));
    std::fs::remove_file(path).ok();
}

#[test]
fn detects_truncation() {
    let mut block = pbf::BlockBuilder::new();
    block.node(1, 1.0, 1.0, &[]);
    let mut bytes = pbf::file(&[block.build()]);
    bytes.truncate(bytes.len() - 3);
    let path = write_pbf("truncated", &bytes);
    let err = Osm::open(&path).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Truncated { .. }));
    std::fs::remove_file(path).ok();
}

#[test]
fn invalid_queries_are_rejected() {
    let mut block = pbf::BlockBuilder::new();
    block.node(1, 1.0, 1.0, &[]);
    let path = write_pbf("invalid", &pbf::file(&[block.build()]));
    let osm = Osm::open(&path).unwrap();

    let err = osm
        .query(&Query {
            ways: true,
            topology: true,
            ..Query::default()
        })
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidQuery { .. }));

    std::fs::remove_file(path).ok();
}

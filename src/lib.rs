/*!
A queryable reader for the OpenStreetMap PBF file format (\*.osm.pbf).

Opening a file with [`Osm::open`] walks it once, indexing every block and
caching all node coordinates. A [`Query`] then describes which elements to
extract — by type, tag predicates or id sets — and [`Osm::query`] re-reads
only the blocks that can still match, returning a tabular [`Frame`] of
identifiers, tags and member edges, optionally with assembled geometries
(points, linestrings, polygons and multipolygons) or a topology of way
segments split at shared nodes.

## Example: extract the highway network

```no_run
use osmdata::{Osm, Query};

fn main() -> osmdata::Result<()> {
    let osm = Osm::open("region.osm.pbf")?;

    let frame = osm.query(&Query::highways())?;
    for (id, geom) in frame.ids.iter().zip(&frame.geometries) {
        println!("way {}: {:?}", id.osm_id, geom);
    }
    Ok(())
}
```

## Example: custom filters

```no_run
use osmdata::{Osm, Query};

fn main() -> osmdata::Result<()> {
    let osm = Osm::open("region.osm.pbf")?;

    // Cafes and restaurants, but nothing disused.
    let query = Query {
        nodes: true,
        keep: [(
            "amenity".to_owned(),
            vec!["cafe".to_owned(), "restaurant".to_owned()],
        )]
        .into(),
        exclude: [("disused".to_owned(), vec![])].into(),
        geometry: true,
        ..Query::default()
    };
    let frame = osm.query(&query)?;
    println!("{} places", frame.ids.len());
    Ok(())
}
```
*/

pub use crate::blob::{Compression, MAX_BLOB_HEADER_SIZE, MAX_BLOB_MESSAGE_SIZE};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::frame::Frame;
pub use crate::geometry::Geometry;
pub use crate::osm::{Osm, Stats};
pub use crate::query::{Query, TagProjection};
pub use crate::records::{
    ElementInfo, ElementType, GeomClass, Identifier, MemberEdge, TagTriple,
};
pub use crate::topology::Segment;

mod blob;
mod block;
mod codec;
mod defaults;
mod dense;
mod error;
mod frame;
mod geometry;
mod osm;
mod primitives;
mod query;
mod records;
mod topology;

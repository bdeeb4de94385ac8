use criterion::{criterion_group, criterion_main, Criterion};
use osmdata::{Osm, Query};

criterion_group!(benches, bench_query);
criterion_main!(benches);

fn bench_query(c: &mut Criterion) {
    let file = env!(
        "OSMDATA_BENCH_FILE",
        "Must specify OSMDATA_BENCH_FILE env var when compiling this benchmark"
    );

    #[cfg(feature = "rust-zlib")]
    println!("Using rust-zlib (miniz_oxide)");
    #[cfg(feature = "zlib")]
    println!("Using zlib");
    #[cfg(feature = "zlib-ng")]
    println!("Using zlib-ng");

    let osm = Osm::open(file).unwrap();
    let query = Query::highways();

    c.bench_function(format!("highway query on {file}").as_str(), |b| {
        b.iter(|| osm.query(&query).unwrap())
    });
}

#![feature(test)]
extern crate test;

use hnsw_connectedness::{analyze, dump, make_random_graph, RandomGraphParameters};
use test::Bencher;

fn bench_params() -> RandomGraphParameters {
    RandomGraphParameters {
        size: 10000,
        ..Default::default()
    }
}

#[bench]
fn analyze_random_graph(b: &mut Bencher) {
    let graph = make_random_graph(&bench_params()).unwrap();

    b.iter(|| {
        let _report = analyze(&graph).unwrap();
    });
}

#[bench]
fn dump_random_graph(b: &mut Bencher) {
    let graph = make_random_graph(&bench_params()).unwrap();

    b.iter(|| dump(&graph, None, true).filter_map(Result::ok).count());
}

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use grn_layout::config::Config;
use grn_layout::parser::parse_network;
use grn_layout::pipeline::{effective_config, lay_out};
use std::hint::black_box;

fn dense_network_source(nodes: usize, extra_links: usize) -> String {
    let mut out = String::new();
    if nodes == 0 {
        return out;
    }
    for i in 0..nodes {
        out.push_str(&format!("node g{i} \"Gene {i}\"\n"));
    }
    for i in 0..nodes.saturating_sub(1) {
        out.push_str(&format!("g{} -> g{}\n", i, i + 1));
    }
    let mut count = 0usize;
    for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_links {
                break;
            }
            if (i + j) % 3 == 0 {
                out.push_str(&format!("g{i} -> g{j}\n"));
                count += 1;
            }
        }
        if count >= extra_links {
            break;
        }
    }
    out
}

fn bench_fixture(c: &mut Criterion) {
    let input = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/benches/fixtures/cascade.grn"));
    let parsed = parse_network(input).expect("parse failed");
    let config = effective_config(Config::default(), &parsed).expect("init config failed");
    c.bench_function("cascade", |b| {
        b.iter(|| lay_out(black_box(&parsed), black_box(&config)).expect("layout failed"))
    });
}

fn bench_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense");
    for &(nodes, extra) in &[(20usize, 20usize), (60, 90), (120, 240)] {
        let parsed = parse_network(&dense_network_source(nodes, extra)).expect("parse failed");
        let config = Config::default();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{nodes}n_{extra}e")),
            &parsed,
            |b, parsed| b.iter(|| lay_out(black_box(parsed), black_box(&config)).expect("layout failed")),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fixture, bench_dense);
criterion_main!(benches);

//! Parser benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lipi_parser::Parser;

fn bench_parse_plain_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    let plain_text = "Hello, World! ".repeat(1000);
    group.throughput(Throughput::Bytes(plain_text.len() as u64));

    group.bench_function("plain_text", |b| {
        b.iter(|| {
            let mut parser = Parser::new();
            let actions = parser.parse(black_box(plain_text.as_bytes()));
            black_box(actions)
        })
    });

    group.finish();
}

fn bench_parse_csi_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    let csi_heavy = "\x1b[1;31mRed\x1b[0m \x1b[5;10H\x1b[2J".repeat(100);
    group.throughput(Throughput::Bytes(csi_heavy.len() as u64));

    group.bench_function("csi_sequences", |b| {
        b.iter(|| {
            let mut parser = Parser::new();
            let actions = parser.parse(black_box(csi_heavy.as_bytes()));
            black_box(actions)
        })
    });

    group.finish();
}

fn bench_parse_utf8(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    let devanagari = "नमस्ते दुनिया ".repeat(500);
    group.throughput(Throughput::Bytes(devanagari.len() as u64));

    group.bench_function("utf8_text", |b| {
        b.iter(|| {
            let mut parser = Parser::new();
            let actions = parser.parse(black_box(devanagari.as_bytes()));
            black_box(actions)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_plain_text,
    bench_parse_csi_sequences,
    bench_parse_utf8
);
criterion_main!(benches);

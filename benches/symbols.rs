//! Benchmarks for symbol interning and table merges.

extern crate classforge;

use classforge::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

/// Interns `count` distinct method references, each pulling in its class, name-and-type and
/// UTF-8 entries.
fn populate(table: &mut SymbolTable, count: usize) {
    for i in 0..count {
        table
            .method_ref(&format!("bench/Owner{}", i % 32), &format!("m{i}"), "(I)V", false)
            .unwrap();
    }
}

fn bench_intern_fresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern");
    group.throughput(Throughput::Elements(1024));
    group.bench_function("fresh_1024", |b| {
        b.iter(|| {
            let mut table = SymbolTable::new();
            populate(&mut table, black_box(1024));
            black_box(table)
        });
    });
    group.finish();
}

fn bench_intern_existing(c: &mut Criterion) {
    let mut table = SymbolTable::new();
    populate(&mut table, 1024);

    c.bench_function("intern_existing", |b| {
        b.iter(|| {
            let index = table
                .method_ref("bench/Owner7", black_box("m519"), "(I)V", false)
                .unwrap();
            black_box(index)
        });
    });
}

fn bench_merge_parsed_pool(c: &mut Criterion) {
    let mut builder = InterfaceBuilder::new("bench/Api");
    for i in 0..128 {
        builder = builder.method(&format!("call{i}"), "(Ljava/lang/String;J)Ljava/lang/Object;");
    }
    let metadata = ClassMetadataReader::parse(&builder.build().unwrap()).unwrap();

    c.bench_function("merge_parsed_pool", |b| {
        b.iter(|| {
            let mut table = SymbolTable::new();
            let remapping = table.merge_items(black_box(&metadata.constant_pool)).unwrap();
            black_box(remapping)
        });
    });
}

criterion_group!(
    benches,
    bench_intern_fresh,
    bench_intern_existing,
    bench_merge_parsed_pool
);
criterion_main!(benches);

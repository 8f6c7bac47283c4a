#![allow(missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;
use treecode::codec::cbor::CborEncoder;
use treecode::codec::json::JsonEncoder;
use treecode::{Encode, NativeTransform, TreeEncoder};

#[derive(Clone, Encode)]
struct BenchItem {
    id: u64,
    label: String,
    #[treecode(skip_none)]
    parent: Option<u64>,
    payload: Vec<u32>,
}

#[derive(Clone, Encode)]
struct BenchCollection {
    name: String,
    attributes: BTreeMap<String, i64>,
    items: Vec<BenchItem>,
}

fn generate_data(count: usize) -> BenchCollection {
    let items = (0..count)
        .map(|i| BenchItem {
            id: i as u64,
            label: format!("item-{i}"),
            parent: (i % 3 == 0).then(|| i as u64 / 3),
            payload: vec![i as u32; 16],
        })
        .collect();
    let attributes = (0..32).map(|i| (format!("attr{i}"), i)).collect();
    BenchCollection {
        name: "bench".into(),
        attributes,
        items,
    }
}

// --- BENCHMARKS ---

fn bench_tree(c: &mut Criterion) {
    let item_count = 10_000;
    let data = generate_data(item_count);
    let encoder = TreeEncoder::new(NativeTransform);

    let mut group = c.benchmark_group("tree");
    group.throughput(Throughput::Elements(item_count as u64));
    group.bench_function("encode", |b| {
        b.iter(|| encoder.encode(black_box(&data)));
    });

    let batch: Vec<BenchCollection> = (0..8).map(|_| generate_data(item_count / 8)).collect();
    group.bench_function("encode_many", |b| {
        b.iter(|| encoder.encode_many(black_box(&batch)));
    });
    group.finish();
}

fn bench_codecs(c: &mut Criterion) {
    let item_count = 10_000;
    let data = generate_data(item_count);
    let cbor = CborEncoder::new();
    let canonical = CborEncoder::new().deterministic(true);
    let json = JsonEncoder::new();

    let mut group = c.benchmark_group("codecs");
    group.throughput(Throughput::Elements(item_count as u64));
    group.bench_function("cbor", |b| b.iter(|| cbor.to_vec(black_box(&data))));
    group.bench_function("cbor_deterministic", |b| {
        b.iter(|| canonical.to_vec(black_box(&data)));
    });
    group.bench_function("json", |b| b.iter(|| json.to_string(black_box(&data))));
    group.finish();
}

criterion_group!(benches, bench_tree, bench_codecs);
criterion_main!(benches);

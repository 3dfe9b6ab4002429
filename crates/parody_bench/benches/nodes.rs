//! Node allocation and release benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parody_bench::{free_all, payload, populate};
use parody_storage::{Config, Node, NodeFile};
use tempfile::TempDir;

/// Benchmark allocating past the watermark in memory.
fn bench_inmemory_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_alloc");

    for count in [64, 256, 1024].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let file = NodeFile::open_in_memory().unwrap();
                black_box(populate(&file, count));
            });
        });
    }

    group.finish();
}

/// Benchmark a free/reuse cycle through the free list.
fn bench_inmemory_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_reuse");

    for count in [64, 256, 1024].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let file = NodeFile::open_in_memory().unwrap();
            let nodes = populate(&file, count);

            b.iter(|| {
                free_all(&file, &nodes);
                for _ in 0..count {
                    let number = file.new_node().unwrap();
                    black_box(number);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark walking a chain of linked nodes in a file.
fn bench_file_chain_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_chain_walk");

    // Use larger sample size for file operations
    group.sample_size(50);

    for count in [64, 256].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("bench.nodes");
            let file = NodeFile::open(&path).unwrap();

            let nodes = populate(&file, count);
            for pair in nodes.windows(2) {
                let mut node = Node::acquire(&file, pair[0]).unwrap();
                node.set_next(pair[1]);
            }

            b.iter(|| {
                let mut current = nodes[0];
                let mut visited = 0;
                while current != 0 {
                    current = Node::acquire(&file, current).unwrap().next();
                    visited += 1;
                }
                black_box(visited);
            });
        });
    }

    group.finish();
}

/// Benchmark rewriting a payload and flushing the header, with and without sync.
fn bench_file_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_flush");
    group.sample_size(20); // Sync is slow

    for sync in [false, true] {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bench.nodes");
        let file = NodeFile::open_with_config(&path, Config::new().sync_on_flush(sync)).unwrap();
        let data = payload();
        let number = populate(&file, 1)[0];

        group.bench_function(if sync { "synced" } else { "unsynced" }, |b| {
            b.iter(|| {
                Node::acquire(&file, number)
                    .unwrap()
                    .write_payload(black_box(&data))
                    .unwrap();
                file.flush_header().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_inmemory_alloc,
    bench_inmemory_reuse,
    bench_file_chain_walk,
    bench_file_flush,
);
criterion_main!(benches);

//! Criterion benchmarks for the multi-threaded pipelines, memory to memory.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use turbosqueeze::corpus;
use turbosqueeze::pipeline::{Compressor, Decompressor, Sink, SinkResult, Source};

const PAYLOAD: usize = 1 << 24;

fn bench_pipeline(c: &mut Criterion) {
    let data = corpus::sawtooth(PAYLOAD);
    let compressor = Compressor::new();
    let decompressor = Decompressor::new();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(PAYLOAD as u64));

    group.bench_function("compress_16MiB", |b| {
        b.iter(|| {
            let outcome = compressor.compress(
                Source::Memory(data.clone()),
                Sink::Memory,
                true,
                1,
            );
            assert!(outcome.success);
        });
    });

    let outcome = compressor.compress(Source::Memory(data.clone()), Sink::Memory, true, 1);
    let Some(SinkResult::Memory(compressed)) = outcome.output else {
        panic!("compression failed");
    };

    group.bench_function("decompress_16MiB", |b| {
        b.iter(|| {
            let outcome =
                decompressor.decompress(Source::Memory(compressed.clone()), Sink::Memory);
            assert!(outcome.success);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);

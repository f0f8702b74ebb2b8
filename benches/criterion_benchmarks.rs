use chunkflate::codec::{Deflater, Format, Inflater, deflate_all};
use chunkflate::pipeline::{Pipeline, PipelineOptions};
use chunkflate::sink::DiscardSink;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for i in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        // Mostly a repeating pattern so the data is compressible.
        out.push(if i % 4 == 0 { (s >> 33) as u8 } else { (i % 61) as u8 });
    }
    out
}

fn deflate_run(data: &[u8], chunk_size: usize, level: u32) -> Vec<u8> {
    Pipeline::new(
        data,
        Deflater::new(level, Format::Zlib),
        DiscardSink,
        "bench.deflate",
        PipelineOptions { chunk_size },
    )
    .run_to_end(|_| {})
    .unwrap()
    .output
}

fn bench_deflate_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("deflate_speed_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let data = gen_data(size, 1);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(deflate_run(black_box(&data), 64 * 1024, 6)));
        });
    }
    g.finish();
}

fn bench_inflate_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("inflate_speed_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let packed = deflate_all(&gen_data(size, 2), 6, Format::Zlib).unwrap();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let out = Pipeline::new(
                    packed.as_slice(),
                    Inflater::default(),
                    DiscardSink,
                    "bench",
                    PipelineOptions::default(),
                )
                .run_to_end(|_| {})
                .unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_chunk_size(c: &mut Criterion) {
    let mut g = c.benchmark_group("deflate_vs_chunk_size");
    let data = gen_data(4 * 1024 * 1024, 3);
    g.throughput(Throughput::Bytes(data.len() as u64));
    for chunk_size in [4 * 1024usize, 64 * 1024, 1024 * 1024] {
        g.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, chunk_size| {
                b.iter(|| black_box(deflate_run(&data, *chunk_size, 6)));
            },
        );
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_deflate_speed,
    bench_inflate_speed,
    bench_chunk_size
);
criterion_main!(benches);

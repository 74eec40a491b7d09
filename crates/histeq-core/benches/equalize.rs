//! Benchmarks for histeq-core equalization
//!
//! Run with: cargo bench -p histeq-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use histeq_core::models::{BinConfig, ImageData};
use histeq_core::{cpu, gpu};

/// Generate synthetic grayscale test image data
fn generate_test_image(width: u32, height: u32) -> ImageData {
    let pixel_count = (width * height) as usize;
    let mut samples = Vec::with_capacity(pixel_count);

    for i in 0..pixel_count {
        let x = (i % width as usize) as f32 / width as f32;
        let y = (i / width as usize) as f32 / height as f32;

        // Mid-heavy distribution so equalization has real work to do
        let v = 64.0 + 128.0 * (x * y);
        samples.push(v as u8);
    }

    ImageData::new(width, height, 1, samples).expect("valid bench image")
}

/// Benchmark the CPU reference pipeline end to end
fn bench_cpu_equalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_equalize");

    for size in [256, 512, 1024, 2048].iter() {
        let width = *size;
        let height = *size;
        let sample_count = (width * height) as u64;

        group.throughput(Throughput::Elements(sample_count));

        group.bench_with_input(
            BenchmarkId::new("equalize", format!("{}x{}", width, height)),
            &(width, height),
            |b, &(w, h)| {
                let image = generate_test_image(w, h);
                let bins = BinConfig::new(256).unwrap();
                b.iter(|| cpu::equalize(black_box(&image), black_box(bins)));
            },
        );
    }

    group.finish();
}

/// Benchmark the individual CPU stages
fn bench_cpu_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_stages");

    let image = generate_test_image(1024, 1024);
    let bins = BinConfig::new(256).unwrap();
    let sample_count = image.sample_count() as u64;

    group.throughput(Throughput::Elements(sample_count));

    group.bench_function("build_histogram", |b| {
        b.iter(|| cpu::build_histogram(black_box(&image), black_box(bins)));
    });

    let histogram = cpu::build_histogram(&image, bins);
    group.bench_function("build_cumulative", |b| {
        b.iter(|| cpu::build_cumulative(black_box(&histogram)));
    });

    let cumulative = cpu::build_cumulative(&histogram);
    let lut = cpu::build_lut(&cumulative, image.sample_count());
    group.bench_function("remap", |b| {
        b.iter(|| cpu::remap(black_box(&image), black_box(&lut), black_box(bins)));
    });

    group.finish();
}

/// Benchmark bin count sensitivity on the CPU path
fn bench_bin_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("bin_counts");

    let image = generate_test_image(1024, 1024);
    group.throughput(Throughput::Elements(image.sample_count() as u64));

    for count in [16u32, 64, 256].iter() {
        let bins = BinConfig::new(*count).unwrap();
        group.bench_with_input(BenchmarkId::new("equalize", count), &bins, |b, &bins| {
            b.iter(|| cpu::equalize(black_box(&image), black_box(bins)));
        });
    }

    group.finish();
}

/// Benchmark the GPU pipeline end to end, when an adapter is present
fn bench_gpu_equalize(c: &mut Criterion) {
    if !gpu::is_gpu_available() {
        eprintln!("GPU not available, skipping GPU benchmarks");
        return;
    }

    let ctx = gpu::GpuContext::new(Default::default()).expect("Failed to create GPU context");
    let mut group = c.benchmark_group("gpu_equalize");
    // Each iteration allocates buffers, runs four blocking dispatches,
    // and reads everything back; keep sample sizes modest.
    group.sample_size(20);

    for size in [512, 1024, 2048].iter() {
        let width = *size;
        let height = *size;
        let sample_count = (width * height) as u64;

        group.throughput(Throughput::Elements(sample_count));

        group.bench_with_input(
            BenchmarkId::new("equalize", format!("{}x{}", width, height)),
            &(width, height),
            |b, &(w, h)| {
                let image = generate_test_image(w, h);
                let bins = BinConfig::new(256).unwrap();
                b.iter(|| gpu::equalize(black_box(&ctx), black_box(&image), black_box(bins)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cpu_equalize,
    bench_cpu_stages,
    bench_bin_counts,
    bench_gpu_equalize,
);

criterion_main!(benches);

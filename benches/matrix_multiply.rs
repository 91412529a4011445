//! Benchmarks for local and distributed sparse matrix multiplication
//!
//! Operands come from the seeded generator, so runs are comparable across
//! machines and commits.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use csrmul::generate::{generate_csr_seeded, GeneratorConfig};
use csrmul::utils::to_sprs_csr;
use csrmul::{distributed_spgemm, local_spgemm, AccumulatorKind, DistributedConfig, KernelConfig};
use std::hint::black_box;
use std::time::Duration;

fn sparse_config() -> GeneratorConfig {
    GeneratorConfig {
        density: 0.05,
        ..GeneratorConfig::default()
    }
}

/// Accumulator strategies and row parallelism on a single worker
fn bench_local_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_kernel");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(5));

    for size in [100, 400, 1000] {
        let a = generate_csr_seeded(size, size, &sparse_config(), 42).unwrap();
        let b = generate_csr_seeded(size, size, &sparse_config(), 43).unwrap();
        group.throughput(Throughput::Elements((a.nnz() + b.nnz()) as u64));

        let kernels = [
            ("dense", KernelConfig::default()),
            ("sparse", KernelConfig::default().with_accumulator(AccumulatorKind::Sparse)),
            ("dense_row_parallel", KernelConfig::default().with_row_parallel(true)),
        ];
        for (name, config) in kernels {
            group.bench_function(BenchmarkId::new(name, size), |bencher| {
                bencher.iter(|| local_spgemm(black_box(&a), black_box(&b), black_box(&config)))
            });
        }

        let a_sprs = to_sprs_csr(&a).unwrap();
        let b_sprs = to_sprs_csr(&b).unwrap();
        group.bench_function(BenchmarkId::new("sprs", size), |bencher| {
            bencher.iter(|| black_box(&a_sprs) * black_box(&b_sprs))
        });
    }
    group.finish();
}

/// Full distributed run, including broadcast and reassembly
fn bench_distributed(c: &mut Criterion) {
    let mut group = c.benchmark_group("distributed");
    group.sample_size(20);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(5));

    let size = 800;
    let a = generate_csr_seeded(size, size, &sparse_config(), 7).unwrap();
    let b = generate_csr_seeded(size, size, &sparse_config(), 8).unwrap();
    group.throughput(Throughput::Elements((a.nnz() + b.nnz()) as u64));

    let max_workers = num_cpus::get().max(1);
    let mut workers = 1;
    while workers <= max_workers {
        let config = DistributedConfig::with_workers(workers);
        group.bench_function(BenchmarkId::new("workers", workers), |bencher| {
            bencher.iter(|| distributed_spgemm(black_box(&a), black_box(&b), &config))
        });
        workers *= 2;
    }
    group.finish();
}

criterion_group!(benches, bench_local_kernel, bench_distributed);
criterion_main!(benches);

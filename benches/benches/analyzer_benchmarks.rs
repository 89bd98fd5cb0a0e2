//! Data-flow Analyzer Benchmarks
//!
//! Measures the analyzer alone and with rewriting passes attached, over
//! generated programs of growing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sable_benchmarks::{many_functions, nested_control_flow, straight_line};
use sable_dialect::EvmDialect;
use sable_opt::{run_pass, DataFlowAnalyzer, LoadResolver, Rematerialiser};

// ============================================================================
// Analysis Only
// ============================================================================

fn bench_analysis(c: &mut Criterion) {
    let dialect = EvmDialect::new();
    let mut group = c.benchmark_group("data_flow_analysis");

    for size in [16usize, 128, 512] {
        let program = straight_line(size);
        group.throughput(Throughput::Elements(program.statements.len() as u64));
        group.bench_with_input(BenchmarkId::new("straight_line", size), &program, |b, program| {
            b.iter(|| {
                let mut block = program.clone();
                let result = DataFlowAnalyzer::new(&dialect).run(black_box(&mut block));
                black_box(result)
            })
        });
    }

    for depth in [4usize, 16, 64] {
        let program = nested_control_flow(depth);
        group.bench_with_input(BenchmarkId::new("nested_control_flow", depth), &program, |b, program| {
            b.iter(|| {
                let mut block = program.clone();
                let result = DataFlowAnalyzer::new(&dialect).run(black_box(&mut block));
                black_box(result)
            })
        });
    }

    let program = many_functions(256);
    group.bench_function("many_functions", |b| {
        b.iter(|| {
            let mut block = program.clone();
            let result = DataFlowAnalyzer::new(&dialect).run(black_box(&mut block));
            black_box(result)
        })
    });

    group.finish();
}

// ============================================================================
// Rewriting Passes
// ============================================================================

fn bench_passes(c: &mut Criterion) {
    let dialect = EvmDialect::new();
    let mut group = c.benchmark_group("rewriting_passes");

    for size in [128usize, 512] {
        let program = straight_line(size);
        group.bench_with_input(BenchmarkId::new("rematerialise_and_resolve", size), &program, |b, program| {
            b.iter(|| {
                let mut block = program.clone();
                let mut passes = (Rematerialiser::new(), LoadResolver::new());
                let result = run_pass(&mut passes, &dialect, black_box(&mut block));
                black_box((result, block))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analysis, bench_passes);
criterion_main!(benches);

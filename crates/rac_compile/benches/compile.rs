//! Compilation pass benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rac_core::prelude::*;
use rac_compile::{gates_by_layer, place, route_stage, schedule_commuting};

/// Deterministic pseudo-3-regular gate list: three shifted perfect
/// matchings over `n` qubits.
fn regular_gates(n: usize) -> Vec<Gate> {
    let mut gates = Vec::new();
    for shift in [1, 3, 5] {
        for i in (0..n).step_by(2) {
            gates.push(Gate::new(i, (i + shift) % n).unwrap());
        }
    }
    gates
}

fn bench_scheduling(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_coloring");
    for n in [30, 60, 100] {
        let gates = regular_gates(n);
        group.bench_with_input(BenchmarkId::new("qubits", n), &gates, |b, gates| {
            b.iter(|| schedule_commuting(n, gates).unwrap())
        });
    }
    group.finish();
}

fn bench_placement(c: &mut Criterion) {
    let n = 30;
    let gates = regular_gates(n);
    let schedule = schedule_commuting(n, &gates).unwrap();
    let layers = gates_by_layer(&schedule, &gates);

    c.bench_function("sa_placement_30", |b| {
        b.iter(|| place((16, 16), n, &layers, false).unwrap())
    });
}

fn bench_routing(c: &mut Criterion) {
    let n = 30;
    let chip = ChipGeometry::square(16);
    let gates = regular_gates(n);
    let schedule = schedule_commuting(n, &gates).unwrap();
    let layers = gates_by_layer(&schedule, &gates);
    let mapping = place((16, 16), n, &layers, false).unwrap();
    let config = CompilerConfig {
        reverse_to_initial: true,
        ..CompilerConfig::default()
    };

    c.bench_function("route_first_stage_30", |b| {
        b.iter(|| route_stage(&chip, n, 0, &layers, mapping.clone(), &config).unwrap())
    });
}

criterion_group!(benches, bench_scheduling, bench_placement, bench_routing);
criterion_main!(benches);

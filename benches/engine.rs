//! Engine benchmarks against the in-process oracle.
//!
//! These measure the generation overhead only (covering array, completion, bookkeeping);
//! a real model checker call dwarfs all of it.
//!
//! Run with:
//! ```bash
//! cargo bench --bench engine
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use ctd_rs::completion::{BacktrackingCompletion, GreedyCompletion};
use ctd_rs::engine::RowEngine;
use ctd_rs::extract::TraceExtractor;
use ctd_rs::factor::{Factor, FactorId, FactorSpace};
use ctd_rs::formula::FormulaBuilder;
use ctd_rs::ipo::covering_array;
use ctd_rs::pairs::Pair;
use ctd_rs::row::PartialRow;
use ctd_rs::simulate::SimulatedOracle;

fn space(sizes: &[usize]) -> FactorSpace {
    let factors = sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let name = format!("f{}", i);
            let values: Vec<i64> = (0..n as i64).collect();
            Factor::integer(name.clone(), name, &values)
        })
        .collect();
    FactorSpace::new(factors).expect("valid factors")
}

/// Each value pair is forbidden with probability `density`.
fn forbidden_pairs(sizes: &[usize], density: f64, seed: u64) -> Vec<Pair> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pairs = Vec::new();
    for i in 0..sizes.len() {
        for j in (i + 1)..sizes.len() {
            for vi in 0..sizes[i] {
                for vj in 0..sizes[j] {
                    if rng.gen_bool(density) {
                        pairs.push(Pair::new(FactorId::new(i), vi, FactorId::new(j), vj));
                    }
                }
            }
        }
    }
    pairs
}

fn admits(forbidden: &[Pair], partial: &PartialRow) -> bool {
    !forbidden.iter().any(|p| {
        let (f1, v1) = p.first();
        let (f2, v2) = p.second();
        partial.get(f1) == Some(v1) && partial.get(f2) == Some(v2)
    })
}

// ============================================================================
// Phase 1 covering array
// ============================================================================

fn bench_covering_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("covering_array");
    for k in [5, 10, 20] {
        let sizes = vec![3; k];
        group.throughput(Throughput::Elements(k as u64));
        group.bench_with_input(BenchmarkId::from_parameter(k), &sizes, |b, sizes| {
            b.iter(|| covering_array(sizes))
        });
    }
    group.finish();
}

// ============================================================================
// Full runs
// ============================================================================

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");
    group.sample_size(20);
    let formulas = FormulaBuilder::new(Some("end".to_string()));
    let extractor = TraceExtractor::new("step").with_termination_flag(Some("end".to_string()));

    for k in [6, 10, 14] {
        let sizes: Vec<usize> = (0..k).map(|i| 2 + i % 3).collect();
        let space = space(&sizes);
        let forbidden = forbidden_pairs(&sizes, 0.05, 42);

        group.bench_with_input(BenchmarkId::new("backtracking", k), &space, |b, space| {
            b.iter(|| {
                let oracle = SimulatedOracle::new(space.clone(), "step", Some("end"), |p: &PartialRow| {
                    admits(&forbidden, p)
                });
                RowEngine::new(space, &formulas, &extractor, oracle)
                    .with_completion(BacktrackingCompletion::default())
                    .run()
                    .expect("run succeeds")
            })
        });
        group.bench_with_input(BenchmarkId::new("greedy", k), &space, |b, space| {
            b.iter(|| {
                let oracle = SimulatedOracle::new(space.clone(), "step", Some("end"), |p: &PartialRow| {
                    admits(&forbidden, p)
                });
                RowEngine::new(space, &formulas, &extractor, oracle)
                    .with_completion(GreedyCompletion)
                    .run()
                    .expect("run succeeds")
            })
        });
    }
    group.finish();
}

fn bench_minimize(c: &mut Criterion) {
    let sizes = vec![3; 12];
    let space = space(&sizes);
    let formulas = FormulaBuilder::new(Some("end".to_string()));
    let extractor = TraceExtractor::new("step").with_termination_flag(Some("end".to_string()));
    let forbidden = forbidden_pairs(&sizes, 0.05, 7);
    let oracle = SimulatedOracle::new(space.clone(), "step", Some("end"), |p: &PartialRow| admits(&forbidden, p));
    let outcome = RowEngine::new(&space, &formulas, &extractor, oracle)
        .run()
        .expect("run succeeds");

    c.bench_function("minimize", |b| b.iter(|| outcome.minimize()));
}

criterion_group!(benches, bench_covering_array, bench_run, bench_minimize);
criterion_main!(benches);

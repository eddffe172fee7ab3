//! Benchmarks for chain topology edits
//!
//! Measures performance of:
//! - Growing a chain by repeated mid-chain splices
//! - Hop-count walks on long chains
//! - Full simple-path verification

use std::collections::BTreeMap;

use chainform_topology::{attach, check_simple_path, hop_count, splice_between, AgentId, LedgerStore, Side, TopologyLedger};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

#[derive(Default)]
struct Arena(BTreeMap<AgentId, TopologyLedger>);

impl LedgerStore for Arena {
    type Data = ();

    fn ledger(&self, id: AgentId) -> Option<&TopologyLedger> {
        self.0.get(&id)
    }

    fn ledger_mut(&mut self, id: AgentId) -> Option<&mut TopologyLedger> {
        self.0.get_mut(&id)
    }

    fn ledger_ids(&self) -> Vec<AgentId> {
        self.0.keys().copied().collect()
    }

    fn population(&self) -> usize {
        self.0.len()
    }
}

/// A straight chain 0 - 1 - ... - (n-1), seeded at 0 and grown to the right.
fn straight_chain(n: i64) -> Arena {
    let mut arena = Arena::default();
    arena.0.insert(AgentId(0), TopologyLedger::new());
    for i in 1..n {
        arena.0.insert(AgentId(i), TopologyLedger::new());
        attach(&mut arena, AgentId(i - 1), Side::Right, AgentId(i)).unwrap();
    }
    arena
}

/// Benchmark growing a chain by always splicing next to the seed
fn bench_splice_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("splice_growth");

    for &size in &[10i64, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter(|| {
                let mut arena = straight_chain(2);
                for i in 2..n {
                    let new = AgentId(i);
                    arena.0.insert(new, TopologyLedger::new());
                    let right = arena.0[&AgentId(0)].neighbor(Side::Right).unwrap();
                    splice_between(&mut arena, AgentId(0), right, new).unwrap();
                }
                black_box(arena)
            })
        });
    }
    group.finish();
}

/// Benchmark hop counting from the seed to the far end
fn bench_hop_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("hop_count");

    for &size in &[10i64, 100, 1000, 10_000] {
        let arena = straight_chain(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &arena, |b, arena| {
            b.iter(|| hop_count(arena, black_box(AgentId(0)), Side::Right))
        });
    }
    group.finish();
}

/// Benchmark full path verification
fn bench_check_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_simple_path");

    for &size in &[10i64, 100, 1000] {
        let arena = straight_chain(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &arena, |b, arena| {
            b.iter(|| check_simple_path(black_box(arena)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_splice_growth, bench_hop_count, bench_check_path);
criterion_main!(benches);

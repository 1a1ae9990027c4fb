//! Simulation benchmarks for tilefront_core.
//!
//! Run with: `cargo bench -p tilefront_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tilefront_core::prelude::*;

/// Map generation at a few sizes.
pub fn generation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_map");
    for size in [64u32, 128, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| generate_map(&MapConfig::new(size, size).with_seed(black_box(9))));
        });
    }
    group.finish();
}

/// Corner-to-corner A* on a generated map.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let Ok(map) = Map::generate(128, 128, 12_345) else {
        return;
    };
    let anchors = map.anchors();
    let nav = NavGrid::from_map(&map, Connectivity::FourWay);
    let start = TilePos::new(anchors.player.x + 2, anchors.player.y);
    let goal = TilePos::new(anchors.enemy.x - 2, anchors.enemy.y);

    c.bench_function("find_path_128", |b| {
        b.iter(|| find_path(&nav, black_box(start), black_box(goal), Mobility::Ground));
    });
}

/// One tick of a match with production running on both sides.
pub fn tick_benchmark(c: &mut Criterion) {
    let config = MatchConfig::new(100, 100).with_starting_resources(ResourceAmounts::new(
        100_000, 100_000, 0,
    ));
    let Ok(mut state) = MatchState::new(config) else {
        return;
    };
    for owner in Owner::SIDES {
        if let Some(cc) = state.command_center(owner) {
            let _ = state.request_spawn(cc, UnitKind::Harvester);
        }
    }

    c.bench_function("tick_100x100", |b| {
        b.iter(|| state.tick(black_box(16)));
    });
}

criterion_group!(
    benches,
    generation_benchmark,
    pathfinding_benchmark,
    tick_benchmark
);
criterion_main!(benches);

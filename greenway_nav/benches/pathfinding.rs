// Criterion benches for the hot paths: long A* searches, parallel batches,
// and region rebuilds against full rebuilds after a local edit.
//
// Worlds come from `scenario::random_world` with fixed seeds so numbers are
// comparable across runs.

use criterion::{Criterion, criterion_group, criterion_main};
use greenway_nav::edit::WorldEdit;
use greenway_nav::obstacle::NaturalKind;
use greenway_nav::pathfinding::{PathOptions, PathRequest};
use greenway_nav::prng::WorldRng;
use greenway_nav::scenario;
use greenway_nav::types::WorldPos;
use std::hint::black_box;

const SIZE: u32 = 128;

fn corner_to_corner(c: &mut Criterion) {
    let Ok(world) = scenario::random_world(1, SIZE, SIZE, 0.6) else {
        return;
    };
    let start = scenario::at(1, 1);
    let goal = scenario::at(SIZE as i32 - 2, SIZE as i32 - 2);
    c.bench_function("astar_corner_to_corner_128", |b| {
        b.iter(|| world.request_path(black_box(start), black_box(goal), PathOptions::default()))
    });
}

fn batch(c: &mut Criterion) {
    let Ok(world) = scenario::random_world(2, SIZE, SIZE, 0.6) else {
        return;
    };
    let mut rng = WorldRng::new(2);
    let requests: Vec<PathRequest> = (0..64)
        .map(|_| {
            let a = WorldPos::new(rng.range_f32(0.0, SIZE as f32), rng.range_f32(0.0, SIZE as f32));
            let b = WorldPos::new(rng.range_f32(0.0, SIZE as f32), rng.range_f32(0.0, SIZE as f32));
            PathRequest::new(a, b)
        })
        .collect();
    c.bench_function("astar_batch_64", |b| {
        b.iter(|| world.request_path_batch(black_box(&requests)))
    });
}

fn rebuilds(c: &mut Criterion) {
    let Ok(mut world) = scenario::random_world(3, SIZE, SIZE, 0.6) else {
        return;
    };
    let spawn = WorldEdit::SpawnObstacle {
        kind: NaturalKind::Tree,
        center: WorldPos::new(64.0, 64.0),
        radius: 1.5,
    };
    c.bench_function("region_rebuild_tree", |b| {
        b.iter(|| {
            world.notify_region_changed(64.0, 64.0, 1.5);
            world.drain_rebuilds()
        })
    });
    world.step(&[spawn]);
    c.bench_function("full_rebuild_128", |b| {
        b.iter(|| {
            world.notify_full_rebuild_needed();
            world.drain_rebuilds()
        })
    });
}

criterion_group!(benches, corner_to_corner, batch, rebuilds);
criterion_main!(benches);

//! Benchmarks for the synchronous setup work around a slide cycle.
//!
//! Measures the costs that sit on the start path before any timers run:
//! - Playlist construction, both direct and cycled from a short pool
//! - The state machine's transition legality table
//! - Per-run bookkeeping on the state manager (claim, snapshot, close-out)

use criterion::{criterion_group, criterion_main, Criterion};
use slidecycle::models::{CycleStatus, SlideshowState};
use slidecycle::{ImageSource, Playlist, StateManager};
use std::hint::black_box;

fn sources(count: usize) -> Vec<ImageSource> {
    (0..count)
        .map(|i| ImageSource::new(format!("media1/slide{i:03}.jpg")))
        .collect()
}

/// Benchmark playlist construction paths.
fn bench_playlist_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("playlist_construction");

    let short_pool = sources(2);
    let large_pool = sources(64);

    group.bench_function("cycled_from_short_pool", |b| {
        b.iter(|| black_box(Playlist::cycled(&short_pool, 6)));
    });

    group.bench_function("cycled_from_large_pool", |b| {
        b.iter(|| black_box(Playlist::cycled(&large_pool, 48)));
    });

    group.bench_function("direct", |b| {
        b.iter(|| black_box(Playlist::new(sources(6))));
    });

    group.finish();
}

/// Benchmark the transition legality table across every state pair.
fn bench_transition_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_machine");

    let states = [
        SlideshowState::Idle,
        SlideshowState::Starting,
        SlideshowState::Running,
        SlideshowState::Ending,
    ];

    group.bench_function("legality_table", |b| {
        b.iter(|| {
            for from in states {
                for to in states {
                    black_box(from.can_transition(to));
                }
            }
        });
    });

    group.finish();
}

/// Benchmark per-run bookkeeping on the state manager.
fn bench_run_bookkeeping(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_bookkeeping");

    group.bench_function("claim_and_finish", |b| {
        let manager = StateManager::new();
        b.iter(|| {
            let epoch = manager.begin_cycle(6);
            manager.transition(SlideshowState::Running);
            manager.transition(SlideshowState::Ending);
            manager.finish_cycle(false);
            black_box(epoch);
        });
    });

    group.bench_function("status_snapshot", |b| {
        let manager = StateManager::new();
        manager.begin_cycle(6);
        b.iter(|| {
            let status: CycleStatus = manager.snapshot();
            black_box(status);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_playlist_construction,
    bench_transition_checks,
    bench_run_bookkeeping
);
criterion_main!(benches);

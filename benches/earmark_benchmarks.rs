//! # earmark Performance Benchmarks
//!
//! ## Benchmark Categories
//!
//! - **Rankings**: Frecency and suggestions over generated hearing logs
//! - **Store**: Registering hearings and ranking straight from SQLite
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench rankings
//! cargo bench store
//! ```

use chrono::{DateTime, Duration, FixedOffset};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use earmark::algorithm::{self, RankingContext};
use earmark::clock::ManualClock;
use earmark::db::{self, Store};
use earmark::song::SongHearing;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const SONGS: i64 = 500;

fn start() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-01T08:00:00+01:00").expect("valid timestamp")
}

/// A hearing log of `count` entries over `SONGS` songs, a few minutes apart.
fn create_hearings(count: usize) -> Vec<SongHearing> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut at = start();

    (0..count)
        .map(|_| {
            at += Duration::seconds(rng.gen_range(60..600));
            let song_id = rng.gen_range(1..=SONGS);
            SongHearing::new(song_id, format!("Song {song_id:03}"), at)
        })
        .collect()
}

fn create_store(hearings: &[SongHearing]) -> Store<ManualClock> {
    let conn = db::connect_in_memory().expect("Failed to open database");
    let mut store = Store::new(conn, ManualClock::new(start())).expect("Failed to create schema");
    for hearing in hearings {
        store.clock().set(hearing.heard_at);
        store
            .add_hearing_and_song_if_needed(&hearing.name)
            .expect("Failed to register hearing");
    }
    store
}

fn benchmark_rankings(c: &mut Criterion) {
    let mut group = c.benchmark_group("rankings");
    let context = RankingContext::default();

    for size in [1_000, 10_000, 100_000] {
        let hearings = create_hearings(size);
        let now = hearings.last().map_or_else(start, |hearing| hearing.heard_at);

        group.bench_with_input(BenchmarkId::new("frecency", size), &hearings, |b, hearings| {
            b.iter(|| algorithm::frecency(black_box(hearings), now, &context))
        });

        group.bench_with_input(BenchmarkId::new("suggestions", size), &hearings, |b, hearings| {
            b.iter(|| algorithm::suggestions(black_box(hearings), black_box(1), &context))
        });
    }

    group.finish();
}

fn benchmark_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    group.sample_size(20);

    group.bench_function("register_1000_hearings", |b| {
        let hearings = create_hearings(1_000);
        b.iter_batched(
            || hearings.clone(),
            |hearings| black_box(create_store(&hearings)),
            BatchSize::LargeInput,
        )
    });

    let store = create_store(&create_hearings(10_000));
    group.bench_function("list_frecent_10000", |b| {
        b.iter(|| store.list_frecent_songs(black_box(Some(Duration::minutes(30)))))
    });
    group.bench_function("list_suggestions_10000", |b| {
        b.iter(|| store.list_suggestions(black_box("Song 001"), None))
    });

    group.finish();
}

criterion_group!(benches, benchmark_rankings, benchmark_store);
criterion_main!(benches);

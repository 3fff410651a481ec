//! Benchmarks for pattern rebuild and archive searches.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use precedent::prelude::*;

/// Deterministic random-walk day of `n` elementary bars
fn generate_day(label: &str, n: usize, seed: usize) -> DayHistory {
  let mut day = DayHistory::new(label);
  let mut price = 100.0;

  for i in 0..n {
    let step = ((i * 7 + seed * 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let spread = 0.05 + ((i * 3 + seed) % 10) as f64 / 100.0;

    price += step * 0.1;
    day.ingest(price - spread, price + spread);
  }

  day
}

fn generate_archive(days: usize, bars: usize) -> Archive {
  let mut archive = Archive::new();
  for d in 0..days {
    archive.push_day(generate_day(&format!("day {d}"), bars, d)).unwrap();
  }
  archive
}

fn config() -> SearchConfig {
  SearchConfig::builder()
    .time_unit(5)
    .candlesticks(30)
    .first_coefficient(0.5)
    .use_mirror(true)
    .build()
    .unwrap()
}

fn bench_rebuild(c: &mut Criterion) {
  let shape = config().shape;
  let coefficients = shape.coefficients();

  let mut group = c.benchmark_group("rebuild");

  for size in [2_000, 10_000, 23_400].iter() {
    let day = generate_day("bench", *size, 1);

    group.bench_with_input(BenchmarkId::new("day", size), size, |b, _| {
      b.iter(|| {
        let mut day = day.clone();
        black_box(day.rebuild(black_box(&shape), black_box(&coefficients)));
      })
    });
  }

  group.finish();
}

fn bench_search_best(c: &mut Criterion) {
  let config = config();
  let mut archive = generate_archive(20, 5_000);
  archive.prepare(&config);

  let query: Vec<Bar> = archive.days()[3].bars()[1_000..1_150].to_vec();
  let candidates = Period::new(50).unwrap();

  c.bench_function("search_best_20_days", |b| {
    b.iter(|| {
      let _ = black_box(archive.search_best(
        black_box(&query),
        &config,
        candidates,
        ScanPosition::Offline,
        Target::Manual,
      ));
    })
  });

  c.bench_function("search_best_20_days_live", |b| {
    b.iter(|| {
      let _ = black_box(archive.search_best(
        black_box(&query),
        &config,
        candidates,
        ScanPosition::Live(0.25),
        Target::Live,
      ));
    })
  });
}

fn bench_search_graduates(c: &mut Criterion) {
  let config = config();
  let mut archive = generate_archive(20, 5_000);
  archive.prepare(&config);

  let query: Vec<Bar> = archive.days()[7].bars()[2_000..2_150].to_vec();

  c.bench_function("search_graduates_20_days", |b| {
    b.iter(|| {
      let _ = black_box(archive.search_graduates(
        black_box(&query),
        &config,
        0.9,
        ScanPosition::Offline,
        Target::Live,
      ));
    })
  });
}

criterion_group!(benches, bench_rebuild, bench_search_best, bench_search_graduates,);

criterion_main!(benches);

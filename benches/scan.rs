use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use divscan::prelude::*;

fn start_date() -> NaiveDate {
  NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

// Deterministic sawtooth-ish series with plenty of local minima.
fn generate_bars(count: usize) -> Vec<DailyBar> {
  let start = start_date();
  (0..count)
    .map(|i| {
      let close = 100.0 + ((i * 7 + 13) % 100) as f64 / 5.0;
      let open = 100.0 + ((i * 11 + 5) % 100) as f64 / 5.0;
      DailyBar::new(
        start + Days::new(i as u64),
        open,
        open.max(close) + 0.4,
        open.min(close) - 0.4,
        close,
        10_000.0,
      )
    })
    .collect()
}

struct StaticProvider(Vec<DailyBar>);

impl BarProvider for StaticProvider {
  fn fetch(&self, _symbol: &str) -> Result<Vec<DailyBar>> {
    Ok(self.0.clone())
  }
}

fn build_scanner(bars: Vec<DailyBar>) -> DefaultScanner<StaticProvider> {
  ScannerBuilder::new(StaticProvider(bars)).build().unwrap()
}

fn bench_pipeline_stages(c: &mut Criterion) {
  let mut group = c.benchmark_group("pipeline_stages");
  for size in [100usize, 1_000, 10_000] {
    let closes: Vec<f64> = generate_bars(size).iter().map(|bar| bar.close).collect();
    let period = Period::new(14).unwrap();
    group.bench_with_input(BenchmarkId::new("rsi", size), &closes, |b, closes| {
      b.iter(|| rsi(black_box(closes), period))
    });

    let oscillator = rsi(&closes, period);
    let window = PivotWindow::symmetric(5).unwrap();
    group.bench_with_input(
      BenchmarkId::new("pivot_lows", size),
      &oscillator,
      |b, oscillator| b.iter(|| find_pivot_lows(black_box(oscillator), window)),
    );
  }
  group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
  let mut group = c.benchmark_group("snapshot");
  let bars = generate_bars(2_500);

  // Cold: fetch plus the full oscillator/pivot/divergence pipeline.
  group.bench_function("cold", |b| {
    b.iter_batched(
      || build_scanner(bars.clone()),
      |scanner| scanner.snapshot(black_box("BENCH")).unwrap(),
      BatchSize::SmallInput,
    )
  });

  // Hot: served from the per-day cache.
  let hot = build_scanner(bars);
  hot.snapshot("BENCH").unwrap();
  group.bench_function("hot", |b| {
    b.iter(|| hot.snapshot(black_box("BENCH")).unwrap())
  });

  group.finish();
}

fn bench_universe_scan(c: &mut Criterion) {
  let scan_date = start_date() + Days::new(1_000);
  let symbols: Vec<String> = (0..8).map(|i| format!("SYM{:02}", i)).collect();
  let scanner = build_scanner(generate_bars(2_500));
  scanner.scan(scan_date, &symbols, None);

  c.bench_function("scan_8_symbols_hot", |b| {
    b.iter(|| scanner.scan(black_box(scan_date), &symbols, None))
  });
}

criterion_group!(
  benches,
  bench_pipeline_stages,
  bench_snapshot,
  bench_universe_scan
);
criterion_main!(benches);

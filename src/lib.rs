//! # divscan
//!
//! Bullish RSI-divergence scanner for daily OHLCV series.
//!
//! Feed it a [`BarProvider`] and a symbol universe; for each symbol it
//! computes a Wilder-smoothed RSI, confirms oscillator pivot lows, flags
//! the pivots where the oscillator set a higher low against a lower price
//! low, and reports the bars flagged on a requested date. Per-symbol
//! results are memoized per calendar day, and the universe fans out over
//! a rayon thread pool.
//!
//! ## Quick Start
//!
//! ```rust
//! use divscan::prelude::*;
//! use chrono::NaiveDate;
//!
//! // Any source of daily bars works; here, a fixed in-memory history.
//! struct StaticBars(Vec<DailyBar>);
//!
//! impl BarProvider for StaticBars {
//!     fn fetch(&self, _symbol: &str) -> Result<Vec<DailyBar>> {
//!         Ok(self.0.clone())
//!     }
//! }
//!
//! let day = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
//! let bars = vec![
//!     DailyBar::new(day(2), 100.0, 101.5, 99.5, 101.0, 250_000.0),
//!     DailyBar::new(day(3), 101.0, 102.0, 100.0, 100.5, 310_000.0),
//!     DailyBar::new(day(4), 100.5, 101.0, 99.0, 100.0, 280_000.0),
//! ];
//!
//! let scanner = ScannerBuilder::new(StaticBars(bars))
//!     .rsi_period(14)
//!     .pivot_lookback(5)
//!     .build()?;
//!
//! let (hits, failures) = scanner.scan(day(4), &["RELIANCE.NS", "TCS.NS"], None);
//!
//! // Three bars cannot seed a 14-period oscillator, so the scan stays
//! // quiet instead of erroring.
//! assert!(hits.is_empty());
//! assert!(failures.is_empty());
//! # Ok::<(), divscan::ScanError>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. [`BarProvider::fetch`] pulls the full daily history for a symbol
//! 2. [`oscillator::rsi`] computes the smoothed oscillator series
//! 3. [`pivots::find_pivot_lows`] confirms strict local minima
//! 4. [`divergence::bullish_divergences`] compares adjacent pivot pairs
//! 5. [`cache::SymbolCache`] memoizes all of the above per calendar day
//! 6. [`DivergenceScanner::scan`] fans the universe out over rayon and
//!    collects hits and per-symbol failures
//!
//! Scan dates are the caller's business: resolve "now" to the most recent
//! completed session with a [`calendar::TradingCalendar`] before calling
//! [`DivergenceScanner::scan`].

pub mod cache;
pub mod calendar;
pub mod divergence;
pub mod oscillator;
pub mod pivots;
pub mod projection;

pub mod prelude {
    pub use crate::{
        // Calendar
        calendar::{TradingCalendar, WeekdayCalendar},
        // Cache
        cache::{SymbolCache, SymbolSnapshot},
        // Pipeline stages
        divergence::bullish_divergences,
        oscillator::rsi,
        pivots::find_pivot_lows,
        // Projection
        projection::{project, BasePrice, BasePricePolicy, PriceBasis, Projection},
        // Engine
        BarProvider,
        Clock,
        DailyBar,
        DefaultScanner,
        DivergenceHit,
        DivergenceScanner,
        Period,
        PivotWindow,
        ProgressFn,
        // Errors
        Result,
        ScanError,
        ScannerBuilder,
        ScannerConfig,
        SignalProjection,
        SymbolFailure,
        SystemClock,
        OHLCV,
    };
}

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::cache::{SymbolCache, SymbolSnapshot};
use crate::projection::{round2, BasePricePolicy, Projection};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors surfaced by the scanner.
///
/// Only [`ScanError::InvalidConfig`] is fatal; the per-symbol variants
/// are collected as [`SymbolFailure`] entries and never abort a scan. A
/// symbol with too little history for the oscillator or the pivot window
/// is not an error at all: it simply produces no signal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("No data available for {symbol}")]
    DataUnavailable { symbol: String },

    #[error("Fetch failed for {symbol}: {reason}")]
    FetchFailed { symbol: String, reason: String },

    #[error("Invalid bar at index {index} for {symbol}: {reason}")]
    InvalidBars {
        symbol: String,
        index: usize,
        reason: &'static str,
    },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ScanError::InvalidConfig("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

/// Pivot confirmation window; both sides must be > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotWindow {
    left: usize,
    right: usize,
}

impl PivotWindow {
    /// Create a new PivotWindow, validating both sides are > 0
    pub fn new(left: usize, right: usize) -> Result<Self> {
        if left == 0 || right == 0 {
            return Err(ScanError::InvalidConfig("PivotWindow sides must be > 0"));
        }
        Ok(Self { left, right })
    }

    /// Equal confirmation bars on both sides.
    pub fn symmetric(lookback: usize) -> Result<Self> {
        Self::new(lookback, lookback)
    }

    #[inline]
    pub fn left(self) -> usize {
        self.left
    }

    #[inline]
    pub fn right(self) -> usize {
        self.right
    }

    /// Shortest series that can contain a confirmed pivot.
    #[inline]
    pub fn min_len(self) -> usize {
        self.left + self.right + 1
    }
}

impl serde::Serialize for PivotWindow {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        (self.left, self.right).serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for PivotWindow {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let (left, right) = <(usize, usize)>::deserialize(d)?;
        PivotWindow::new(left, right).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// MARKET DATA
// ============================================================

/// Core OHLCV accessor trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// One daily bar with its session date.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl DailyBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for DailyBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Reject series a provider should never hand out.
fn validate_bars(symbol: &str, bars: &[DailyBar]) -> Result<()> {
    let invalid = |index: usize, reason: &'static str| ScanError::InvalidBars {
        symbol: symbol.to_string(),
        index,
        reason,
    };

    for (i, bar) in bars.iter().enumerate() {
        if !(bar.open.is_finite()
            && bar.high.is_finite()
            && bar.low.is_finite()
            && bar.close.is_finite()
            && bar.volume.is_finite())
        {
            return Err(invalid(i, "non-finite value"));
        }
        if bar.high < bar.low {
            return Err(invalid(i, "high < low"));
        }
        if bar.volume < 0.0 {
            return Err(invalid(i, "negative volume"));
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(invalid(i, "dates not strictly ascending"));
        }
    }

    Ok(())
}

// ============================================================
// EXTERNAL SEAMS
// ============================================================

/// External source of daily bar history.
///
/// `fetch` returns the complete series for a symbol, oldest bar first.
/// The scanner validates every series it receives; a malformed one is
/// reported as [`ScanError::InvalidBars`] for that symbol only.
pub trait BarProvider: Send + Sync {
    fn fetch(&self, symbol: &str) -> Result<Vec<DailyBar>>;
}

/// Source of the cache epoch ("today").
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local-time system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

// ============================================================
// SCANNER
// ============================================================

/// Default Wilder smoothing window.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Default confirmation bars on each side of a pivot low.
pub const DEFAULT_PIVOT_LOOKBACK: usize = 5;

/// Default forward-return horizon in trading days.
pub const DEFAULT_HORIZON: usize = 5;

/// Validated scanner settings.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScannerConfig {
    pub rsi_period: Period,
    pub pivot_window: PivotWindow,
    /// Trading days of forward returns attached by [`DivergenceScanner::project`].
    pub horizon: Period,
    pub base_price_policy: BasePricePolicy,
}

/// Bullish RSI-divergence scanner over daily bars.
///
/// Built through [`ScannerBuilder`]. Thread safe: one instance serves
/// concurrent scans, sharing its per-day [`SymbolCache`].
pub struct DivergenceScanner<P: BarProvider, C: Clock = SystemClock> {
    provider: P,
    clock: C,
    config: ScannerConfig,
    cache: SymbolCache,
}

impl<P: BarProvider, C: Clock> DivergenceScanner<P, C> {
    /// Current configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Cached pipeline output for one symbol under today's epoch,
    /// fetching and computing if the cache entry is cold or stale.
    pub fn snapshot(&self, symbol: &str) -> Result<Arc<SymbolSnapshot>> {
        self.snapshot_at(symbol, self.clock.today())
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn snapshot_at(&self, symbol: &str, epoch: NaiveDate) -> Result<Arc<SymbolSnapshot>> {
        self.cache
            .snapshot(symbol, epoch, || self.build_snapshot(symbol))
    }

    fn build_snapshot(&self, symbol: &str) -> Result<SymbolSnapshot> {
        let bars = self.provider.fetch(symbol)?;
        if bars.is_empty() {
            return Err(ScanError::DataUnavailable {
                symbol: symbol.to_string(),
            });
        }
        validate_bars(symbol, &bars)?;

        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let oscillator = oscillator::rsi(&closes, self.config.rsi_period);
        let pivot_lows = pivots::find_pivot_lows(&oscillator, self.config.pivot_window);
        let divergences = divergence::bullish_divergences(&bars, &oscillator, &pivot_lows);
        log::debug!(
            "{}: {} bars, {} pivot lows, {} divergences",
            symbol,
            bars.len(),
            pivot_lows.len(),
            divergences.len()
        );

        Ok(SymbolSnapshot {
            bars,
            oscillator,
            pivots: pivot_lows,
            divergences,
        })
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`DivergenceScanner`] instances.
///
/// Numeric settings are taken raw and checked once in
/// [`build`](Self::build), so a bad period or window surfaces as a single
/// [`ScanError::InvalidConfig`] instead of a panic at a setter.
pub struct ScannerBuilder<P: BarProvider, C: Clock = SystemClock> {
    provider: P,
    clock: C,
    rsi_period: usize,
    pivot_left: usize,
    pivot_right: usize,
    horizon: usize,
    base_price_policy: BasePricePolicy,
}

impl<P: BarProvider> ScannerBuilder<P, SystemClock> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            clock: SystemClock,
            rsi_period: DEFAULT_RSI_PERIOD,
            pivot_left: DEFAULT_PIVOT_LOOKBACK,
            pivot_right: DEFAULT_PIVOT_LOOKBACK,
            horizon: DEFAULT_HORIZON,
            base_price_policy: BasePricePolicy::default(),
        }
    }
}

impl<P: BarProvider, C: Clock> ScannerBuilder<P, C> {
    /// Wilder smoothing window for the oscillator.
    pub fn rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    /// Symmetric pivot confirmation window.
    pub fn pivot_lookback(mut self, bars: usize) -> Self {
        self.pivot_left = bars;
        self.pivot_right = bars;
        self
    }

    /// Asymmetric pivot confirmation window.
    pub fn pivot_window(mut self, left: usize, right: usize) -> Self {
        self.pivot_left = left;
        self.pivot_right = right;
        self
    }

    /// Forward-return horizon in trading days.
    pub fn horizon(mut self, days: usize) -> Self {
        self.horizon = days;
        self
    }

    /// Base price for forward returns.
    pub fn base_price_policy(mut self, policy: BasePricePolicy) -> Self {
        self.base_price_policy = policy;
        self
    }

    /// Change the epoch source.
    pub fn clock<C2: Clock>(self, clock: C2) -> ScannerBuilder<P, C2> {
        ScannerBuilder {
            provider: self.provider,
            clock,
            rsi_period: self.rsi_period,
            pivot_left: self.pivot_left,
            pivot_right: self.pivot_right,
            horizon: self.horizon,
            base_price_policy: self.base_price_policy,
        }
    }

    /// Validate the configuration and build the scanner.
    pub fn build(self) -> Result<DivergenceScanner<P, C>> {
        let config = ScannerConfig {
            rsi_period: Period::new(self.rsi_period)?,
            pivot_window: PivotWindow::new(self.pivot_left, self.pivot_right)?,
            horizon: Period::new(self.horizon)?,
            base_price_policy: self.base_price_policy,
        };

        Ok(DivergenceScanner {
            provider: self.provider,
            clock: self.clock,
            config,
            cache: SymbolCache::new(),
        })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Progress observer: `(completed, total, symbol just finished)`.
///
/// Invoked once per deduplicated symbol, failures included, from worker
/// threads in completion order. The lifetime lets an observer borrow
/// caller-local state for the duration of one scan.
pub type ProgressFn<'a> = dyn Fn(usize, usize, &str) + Sync + 'a;

/// One divergence row for a scan date. Prices and RSI are rounded to two
/// decimals; volume is passed through as reported.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DivergenceHit {
    pub symbol: String,
    pub date: NaiveDate,
    pub rsi: f64,
    pub close: f64,
    pub low: f64,
    pub high: f64,
    pub volume: f64,
}

/// Divergence row enriched with the forward-return projection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignalProjection {
    pub symbol: String,
    pub date: NaiveDate,
    pub rsi: f64,
    #[serde(flatten)]
    pub projection: Projection,
}

/// A symbol the scan had to skip, with the reason.
#[derive(Debug, Clone)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: ScanError,
}

impl<P: BarProvider, C: Clock> DivergenceScanner<P, C> {
    /// Scan `symbols` for bullish divergences flagged on `date`.
    ///
    /// Duplicate symbols are dropped up front (first occurrence wins) and
    /// the remainder fans out across the current rayon pool; run inside a
    /// custom [`rayon::ThreadPool`] to bound concurrency. Hits come back
    /// in universe order. Per-symbol failures are collected, never fatal,
    /// and a symbol with too little history simply reports nothing.
    pub fn scan<S>(
        &self,
        date: NaiveDate,
        symbols: &[S],
        progress: Option<&ProgressFn<'_>>,
    ) -> (Vec<DivergenceHit>, Vec<SymbolFailure>)
    where
        S: AsRef<str> + Sync,
    {
        let epoch = self.clock.today();
        self.for_each_symbol(symbols, progress, |symbol| self.hit_for(symbol, date, epoch))
    }

    /// Like [`scan`](Self::scan), but every hit carries its forward-return
    /// projection.
    pub fn project<S>(
        &self,
        date: NaiveDate,
        symbols: &[S],
        progress: Option<&ProgressFn<'_>>,
    ) -> (Vec<SignalProjection>, Vec<SymbolFailure>)
    where
        S: AsRef<str> + Sync,
    {
        let epoch = self.clock.today();
        self.for_each_symbol(symbols, progress, |symbol| {
            self.projection_for(symbol, date, epoch)
        })
    }

    fn for_each_symbol<S, T, F>(
        &self,
        symbols: &[S],
        progress: Option<&ProgressFn<'_>>,
        row: F,
    ) -> (Vec<T>, Vec<SymbolFailure>)
    where
        S: AsRef<str> + Sync,
        T: Send,
        F: Fn(&str) -> Result<Option<T>> + Sync,
    {
        let universe = dedup_symbols(symbols);
        let total = universe.len();
        let done = AtomicUsize::new(0);
        log::debug!("scanning universe of {} symbols", total);

        let outcomes: Vec<_> = universe
            .par_iter()
            .map(|&symbol| {
                let outcome = row(symbol);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(observer) = progress {
                    observer(finished, total, symbol);
                }
                (symbol, outcome)
            })
            .collect();

        let mut rows = Vec::new();
        let mut failures = Vec::new();

        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {}
                Err(error) => {
                    log::warn!("skipping {}: {}", symbol, error);
                    failures.push(SymbolFailure {
                        symbol: symbol.to_string(),
                        error,
                    });
                }
            }
        }

        (rows, failures)
    }

    fn hit_for(
        &self,
        symbol: &str,
        date: NaiveDate,
        epoch: NaiveDate,
    ) -> Result<Option<DivergenceHit>> {
        let snapshot = self.snapshot_at(symbol, epoch)?;
        let hit = snapshot.divergence_on(date).and_then(|idx| {
            let bar = snapshot.bars[idx];
            let osc = snapshot.oscillator[idx]?;
            Some(DivergenceHit {
                symbol: symbol.to_string(),
                date,
                rsi: round2(osc),
                close: round2(bar.close),
                low: round2(bar.low),
                high: round2(bar.high),
                volume: bar.volume,
            })
        });
        Ok(hit)
    }

    fn projection_for(
        &self,
        symbol: &str,
        date: NaiveDate,
        epoch: NaiveDate,
    ) -> Result<Option<SignalProjection>> {
        let snapshot = self.snapshot_at(symbol, epoch)?;
        let record = snapshot.divergence_on(date).and_then(|idx| {
            let osc = snapshot.oscillator[idx]?;
            let projection = projection::project(
                &snapshot.bars,
                idx,
                self.config.horizon,
                self.config.base_price_policy,
            )?;
            Some(SignalProjection {
                symbol: symbol.to_string(),
                date,
                rsi: round2(osc),
                projection,
            })
        });
        Ok(record)
    }
}

/// Drop duplicate symbols, keeping first occurrences in order.
fn dedup_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(symbols.len());
    let mut unique = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = symbol.as_ref();
        if seen.insert(symbol) {
            unique.push(symbol);
        }
    }
    unique
}

// ============================================================
// TYPE ALIASES
// ============================================================

/// Scanner driven by the system clock.
pub type DefaultScanner<P> = DivergenceScanner<P, SystemClock>;

// ============================================================
// TESTS
// ============================================================

//! Per-symbol, per-day memoization of the scan pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;

use crate::{DailyBar, Result};

/// Fully derived pipeline output for one symbol under one cache epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSnapshot {
    /// Validated daily history, oldest first.
    pub bars: Vec<DailyBar>,
    /// Oscillator series aligned with `bars`.
    pub oscillator: Vec<Option<f64>>,
    /// Confirmed pivot-low indices, ascending.
    pub pivots: Vec<usize>,
    /// Flagged divergence indices, ascending subset of `pivots`.
    pub divergences: Vec<usize>,
}

impl SymbolSnapshot {
    /// Index of the bar dated `date`, if that bar is a flagged divergence.
    pub fn divergence_on(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.bars.binary_search_by_key(&date, |bar| bar.date).ok()?;
        self.divergences.binary_search(&idx).ok()?;
        Some(idx)
    }
}

/// Epoch-keyed snapshot cache with one slot per symbol.
///
/// A lookup under the epoch an entry was built for shares that entry's
/// `Arc`. A stale or absent entry is rebuilt by the caller's closure while
/// the symbol's slot lock is held, so concurrent lookups for one symbol
/// run the build at most once; lookups for other symbols are unaffected.
/// A failed build leaves the slot empty, and the next lookup retries.
#[derive(Debug, Default)]
pub struct SymbolCache {
    slots: Mutex<HashMap<String, Arc<SymbolSlot>>>,
}

#[derive(Debug, Default)]
struct SymbolSlot {
    state: Mutex<SlotState>,
}

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Empty,
    Ready {
        epoch: NaiveDate,
        snapshot: Arc<SymbolSnapshot>,
    },
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the snapshot for `symbol` under `epoch`, running `build`
    /// if the slot is empty or holds a different epoch.
    pub fn snapshot<F>(
        &self,
        symbol: &str,
        epoch: NaiveDate,
        build: F,
    ) -> Result<Arc<SymbolSnapshot>>
    where
        F: FnOnce() -> Result<SymbolSnapshot>,
    {
        let slot = self.slot(symbol);
        // Slot state is only ever replaced after a successful build, so a
        // poisoned lock still guards a consistent value.
        let mut state = slot.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let SlotState::Ready { epoch: cached, snapshot } = &*state {
            if *cached == epoch {
                log::debug!("cache hit for {} @ {}", symbol, epoch);
                return Ok(Arc::clone(snapshot));
            }
            log::debug!("cache stale for {} ({} -> {})", symbol, cached, epoch);
        }

        let snapshot = Arc::new(build()?);
        *state = SlotState::Ready {
            epoch,
            snapshot: Arc::clone(&snapshot),
        };
        Ok(snapshot)
    }

    fn slot(&self, symbol: &str) -> Arc<SymbolSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(symbol) {
            return Arc::clone(slot);
        }
        Arc::clone(slots.entry(symbol.to_string()).or_default())
    }
}

// ============================================================
// TESTS
// ============================================================

//! Forward-return projection for divergence signals.

use crate::{Period, OHLCV};

/// How the projection base price is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BasePricePolicy {
    /// Measure returns from the divergence-day close.
    #[default]
    SignalClose,
    /// Measure returns from the next day's open when one exists, falling
    /// back to the divergence-day close at the end of the series.
    NextOpenElseClose,
}

/// Which price a projection actually measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PriceBasis {
    SignalClose,
    NextOpen,
}

/// The resolved projection base.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BasePrice {
    pub value: f64,
    pub basis: PriceBasis,
}

/// Price context and forward returns for one divergence bar.
///
/// `forward_returns` always holds exactly `horizon` slots; a slot past
/// the end of the series stays `None`, keeping "not yet known" distinct
/// from a zero return. `available_days` is the number of leading slots
/// that are defined.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Projection {
    /// Close of the bar before the signal, when one exists.
    pub prev_close: Option<f64>,
    /// Close of the signal bar itself.
    pub signal_close: f64,
    /// Open of the bar after the signal, when one exists.
    pub next_open: Option<f64>,
    /// `None` when the chosen base price is zero or non-finite; every
    /// return slot is `None` in that case.
    pub base: Option<BasePrice>,
    /// Percentage returns relative to the base, rounded to two decimals.
    pub forward_returns: Vec<Option<f64>>,
    pub available_days: usize,
}

/// Project percentage returns over `horizon` trading days following `idx`.
///
/// Returns `None` only when `idx` is outside `bars`.
pub fn project<T: OHLCV>(
    bars: &[T],
    idx: usize,
    horizon: Period,
    policy: BasePricePolicy,
) -> Option<Projection> {
    let signal_close = bars.get(idx)?.close();
    let prev_close = if idx > 0 {
        bars.get(idx - 1).map(|bar| bar.close())
    } else {
        None
    };
    let next_open = bars.get(idx + 1).map(|bar| bar.open());

    let (value, basis) = match (policy, next_open) {
        (BasePricePolicy::NextOpenElseClose, Some(open)) => (open, PriceBasis::NextOpen),
        _ => (signal_close, PriceBasis::SignalClose),
    };
    let base = (value.is_finite() && value != 0.0).then_some(BasePrice { value, basis });

    let days = horizon.get();
    let mut forward_returns = vec![None; days];
    let mut available_days = 0;

    if let Some(base) = base {
        for j in 1..=days {
            match bars.get(idx + j) {
                Some(future) => {
                    let ret = (future.close() - base.value) / base.value * 100.0;
                    forward_returns[j - 1] = Some(round2(ret));
                    available_days = j;
                }
                None => break,
            }
        }
    }

    Some(Projection {
        prev_close,
        signal_close,
        next_open,
        base,
        forward_returns,
        available_days,
    })
}

/// Round to two decimals, half away from zero. Report precision used for
/// every price and return the crate emits.
#[inline]
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================
// TESTS
// ============================================================

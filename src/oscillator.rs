//! Wilder-smoothed relative strength index.
//!
//! The oscillator feeds the pivot and divergence stages; warm-up entries
//! are represented as `None` rather than a sentinel value so downstream
//! code can tell "not computable yet" from a real reading.

use crate::Period;

/// Compute the RSI of a close series under Wilder smoothing.
///
/// The output always has the same length as the input. The first `period`
/// entries are `None`; index `period` holds the first defined value,
/// seeded from the simple average of the first `period` gains and losses.
/// Every later value follows the recursive form
/// `avg = (prev * (period - 1) + change) / period`.
///
/// A series shorter than `period + 1` closes has no defined value at all.
/// A window with zero net movement in both directions reports the neutral
/// reading `50.0` instead of dividing by zero. Defined readings always
/// lie within `0.0..=100.0`.
pub fn rsi(closes: &[f64], period: Period) -> Vec<Option<f64>> {
    let p = period.get();
    let mut out = vec![None; closes.len()];
    if closes.len() < p + 1 {
        return out;
    }

    let inv = 1.0 / p as f64;
    let decay = 1.0 - inv;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    // Seed: plain average of the first `p` changes.
    for pair in closes.windows(2).take(p) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain *= inv;
    avg_loss *= inv;
    out[p] = Some(strength(avg_gain, avg_loss));

    for i in (p + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = inv * gain + decay * avg_gain;
        avg_loss = inv * loss + decay * avg_loss;
        out[i] = Some(strength(avg_gain, avg_loss));
    }

    out
}

#[inline]
fn strength(avg_gain: f64, avg_loss: f64) -> f64 {
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        50.0
    } else {
        // Quotient first: `avg_gain / total` never rounds above 1.0.
        100.0 * (avg_gain / total)
    }
}

// ============================================================
// TESTS
// ============================================================

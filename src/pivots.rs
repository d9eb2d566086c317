//! Pivot-low detection over an indicator series.

use crate::PivotWindow;

/// Find indices that sit strictly below every neighbor inside the window.
///
/// A candidate at `i` needs `window.left()` slots before it and
/// `window.right()` slots after it, so the leading and trailing stretches
/// of a series can never confirm a pivot. The candidate and every slot in
/// its window must hold a defined, finite value; any `None` or non-finite
/// neighbor disqualifies the candidate. Comparison is strict on both
/// sides, so plateaus produce no pivot. Indices come back ascending.
pub fn find_pivot_lows(values: &[Option<f64>], window: PivotWindow) -> Vec<usize> {
    let mut pivots = Vec::new();
    if values.len() < window.min_len() {
        return pivots;
    }

    for i in window.left()..(values.len() - window.right()) {
        let center = match defined(values[i]) {
            Some(v) => v,
            None => continue,
        };
        let lo = i - window.left();
        let hi = i + window.right();
        let confirmed = (lo..=hi)
            .filter(|&j| j != i)
            .all(|j| matches!(defined(values[j]), Some(neighbor) if center < neighbor));
        if confirmed {
            pivots.push(i);
        }
    }

    pivots
}

#[inline]
fn defined(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

// ============================================================
// TESTS
// ============================================================

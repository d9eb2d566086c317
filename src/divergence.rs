//! Bullish divergence between price lows and oscillator pivot lows.

use crate::OHLCV;

/// Flag pivots where the oscillator set a higher low while price set a
/// lower low.
///
/// Each pivot is judged only against its immediate predecessor in
/// `pivots`; earlier pivots are never revisited, so the first pivot of a
/// series cannot flag. Both comparisons are strict: an equal oscillator
/// low or an equal price low does not count. Returned indices are a
/// subset of `pivots`, ascending. A pair with an undefined oscillator
/// value or an index outside `bars` is skipped, not an error.
pub fn bullish_divergences<T: OHLCV>(
    bars: &[T],
    oscillator: &[Option<f64>],
    pivots: &[usize],
) -> Vec<usize> {
    let mut flagged = Vec::new();
    let value = |i: usize| oscillator.get(i).copied().flatten();

    for pair in pivots.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if prev >= bars.len() || curr >= bars.len() {
            continue;
        }
        if let (Some(osc_prev), Some(osc_curr)) = (value(prev), value(curr)) {
            if osc_curr > osc_prev && bars[curr].low() < bars[prev].low() {
                flagged.push(curr);
            }
        }
    }

    flagged
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Bar {
        low: f64,
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.low + 1.0
        }

        fn high(&self) -> f64 {
            self.low + 2.0
        }

        fn low(&self) -> f64 {
            self.low
        }

        fn close(&self) -> f64 {
            self.low + 1.5
        }

        fn volume(&self) -> f64 {
            1000.0
        }
    }

    fn bars(lows: &[f64]) -> Vec<Bar> {
        lows.iter().map(|&low| Bar { low }).collect()
    }

    fn osc(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_flags_higher_osc_against_lower_price() {
        let bars = bars(&[9.0, 5.0, 7.0, 4.0, 8.0]);
        let osc = osc(&[80.0, 20.0, 60.0, 30.0, 70.0]);
        assert_eq!(bullish_divergences(&bars, &osc, &[1, 3]), vec![3]);
    }

    #[test]
    fn test_first_pivot_never_flags() {
        let bars = bars(&[9.0, 1.0, 8.0]);
        let osc = osc(&[80.0, 5.0, 70.0]);
        assert!(bullish_divergences(&bars, &osc, &[1]).is_empty());
        assert!(bullish_divergences(&bars, &osc, &[]).is_empty());
    }

    #[test]
    fn test_equal_oscillator_low_does_not_flag() {
        let bars = bars(&[9.0, 5.0, 7.0, 4.0, 8.0]);
        let osc = osc(&[80.0, 30.0, 60.0, 30.0, 70.0]);
        assert!(bullish_divergences(&bars, &osc, &[1, 3]).is_empty());
    }

    #[test]
    fn test_equal_price_low_does_not_flag() {
        let bars = bars(&[9.0, 4.0, 7.0, 4.0, 8.0]);
        let osc = osc(&[80.0, 20.0, 60.0, 30.0, 70.0]);
        assert!(bullish_divergences(&bars, &osc, &[1, 3]).is_empty());
    }

    #[test]
    fn test_only_adjacent_pairs_compared() {
        // Pivot 5 sits below pivot 1 on the oscillator; it flags anyway
        // because only the adjacent pair (3, 5) is compared.
        let bars = bars(&[9.0, 5.0, 8.0, 6.0, 8.0, 4.0, 9.0]);
        let osc = osc(&[80.0, 30.0, 70.0, 10.0, 60.0, 20.0, 70.0]);
        assert_eq!(bullish_divergences(&bars, &osc, &[1, 3, 5]), vec![5]);
    }

    #[test]
    fn test_consecutive_divergences() {
        let bars = bars(&[9.0, 6.0, 8.0, 5.0, 8.0, 4.0, 9.0]);
        let osc = osc(&[80.0, 10.0, 70.0, 20.0, 60.0, 30.0, 70.0]);
        assert_eq!(bullish_divergences(&bars, &osc, &[1, 3, 5]), vec![3, 5]);
    }

    #[test]
    fn test_undefined_oscillator_skips_pair() {
        let bars = bars(&[9.0, 5.0, 7.0, 4.0, 8.0]);
        let mut osc = osc(&[80.0, 20.0, 60.0, 30.0, 70.0]);
        osc[1] = None;
        assert!(bullish_divergences(&bars, &osc, &[1, 3]).is_empty());
    }

    #[test]
    fn test_out_of_range_index_skips_pair() {
        let bars = bars(&[9.0, 5.0, 7.0, 4.0, 8.0]);
        let osc = osc(&[80.0, 20.0, 60.0, 30.0, 70.0]);
        assert!(bullish_divergences(&bars, &osc, &[3, 9]).is_empty());
        assert_eq!(bullish_divergences(&bars, &osc, &[1, 3, 9]), vec![3]);
    }
}

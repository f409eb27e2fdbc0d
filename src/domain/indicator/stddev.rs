//! Rolling standard deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_stddev(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let values = rolling_mean_std(bars, period)
        .into_iter()
        .zip(bars)
        .map(|(stats, bar)| IndicatorPoint {
            date: bar.date,
            valid: stats.is_some(),
            value: IndicatorValue::Simple(stats.map(|(_, sd)| sd).unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}

/// `(mean, population stddev)` of each full window of closes ending at `i`.
pub(crate) fn rolling_mean_std(bars: &[OhlcvBar], period: usize) -> Vec<Option<(f64, f64)>> {
    if period == 0 {
        return vec![None; bars.len()];
    }

    (0..bars.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &bars[i + 1 - period..=i];
            let mean = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|b| {
                    let diff = b.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            Some((mean, variance.sqrt()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars;

    #[test]
    fn stddev_warmup() {
        let series = calculate_stddev(&test_bars(&[1.0, 2.0, 3.0, 4.0]), 3);
        let valid: Vec<bool> = series.values.iter().map(|p| p.valid).collect();
        assert_eq!(valid, vec![false, false, true, true]);
    }

    #[test]
    fn stddev_constant_prices_is_zero() {
        let series = calculate_stddev(&test_bars(&[50.0; 5]), 3);
        for v in series.simple_values().into_iter().flatten() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn stddev_known_population_value() {
        // 2,4,4,4,5,5,7,9 has population stddev 2
        let series = calculate_stddev(&test_bars(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        let v = series.values[7].simple().unwrap();
        assert!((v - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stddev_zero_period_is_all_invalid() {
        let series = calculate_stddev(&test_bars(&[1.0, 2.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn stddev_indicator_type() {
        let series = calculate_stddev(&test_bars(&[1.0]), 7);
        assert_eq!(series.indicator_type, IndicatorType::Stddev(7));
    }
}

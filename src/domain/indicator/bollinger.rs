//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! The rule-language series carries its multiplier as hundredths so the
//! type stays hashable; [`bollinger_bands`] takes the multiplier as given.
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::stddev::rolling_mean_std;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Converts a band multiplier to the hundredths used by [`IndicatorType::Bollinger`].
pub fn multiplier_x100(k: f64) -> u32 {
    (k * 100.0).round() as u32
}

/// `(upper, middle, lower)` per bar with the exact multiplier `k`; `None`
/// during warm-up.
pub fn bollinger_bands(
    bars: &[OhlcvBar],
    period: usize,
    k: f64,
) -> Vec<Option<(f64, f64, f64)>> {
    rolling_mean_std(bars, period)
        .into_iter()
        .map(|stats| stats.map(|(mean, sd)| (mean + k * sd, mean, mean - k * sd)))
        .collect()
}

pub fn calculate_bollinger(
    bars: &[OhlcvBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mult = stddev_mult_x100 as f64 / 100.0;

    let values = bollinger_bands(bars, period, mult)
        .into_iter()
        .zip(bars)
        .map(|(b, bar)| {
            let (valid, (upper, middle, lower)) = match b {
                Some(b) => (true, b),
                None => (false, (0.0, 0.0, 0.0)),
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars;

    fn bands(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.values[i].value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => (upper, middle, lower),
            _ => panic!("Expected Bollinger value"),
        }
    }

    #[test]
    fn bollinger_warmup() {
        let series = calculate_bollinger(&test_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3, 200);
        let valid: Vec<bool> = series.values.iter().map(|p| p.valid).collect();
        assert_eq!(valid, vec![false, false, true, true, true]);
    }

    #[test]
    fn bollinger_constant_values_collapse() {
        let series = calculate_bollinger(&test_bars(&[100.0; 5]), 3, 200);
        let (upper, middle, lower) = bands(&series, 2);
        assert!((middle - 100.0).abs() < f64::EPSILON);
        assert!((upper - 100.0).abs() < f64::EPSILON);
        assert!((lower - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let series = calculate_bollinger(&test_bars(&[10.0, 20.0, 30.0]), 3, 200);
        let (upper, middle, lower) = bands(&series, 2);

        let expected_middle: f64 = 20.0;
        let stddev = (200.0_f64 / 3.0).sqrt();
        assert!((middle - expected_middle).abs() < 1e-10);
        assert!((upper - (expected_middle + 2.0 * stddev)).abs() < 1e-10);
        assert!((lower - (expected_middle - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_multiplier_scales_width() {
        let bars = test_bars(&[10.0, 20.0, 30.0]);
        let (u1, m1, _) = bands(&calculate_bollinger(&bars, 3, 100), 2);
        let (u2, m2, _) = bands(&calculate_bollinger(&bars, 3, 250), 2);
        assert!(((u2 - m2) - 2.5 * (u1 - m1)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_symmetry() {
        let series = calculate_bollinger(&test_bars(&[10.0, 20.0, 30.0]), 3, 200);
        let (upper, middle, lower) = bands(&series, 2);
        assert!(((upper - middle) - (middle - lower)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_zero_period() {
        let series = calculate_bollinger(&test_bars(&[10.0, 20.0]), 0, 200);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn multiplier_round_trip() {
        assert_eq!(multiplier_x100(2.0), 200);
        assert_eq!(multiplier_x100(1.5), 150);
        assert_eq!(multiplier_x100(DEFAULT_MULTIPLIER), 200);
    }

    #[test]
    fn bands_use_unrounded_multiplier() {
        let bars = test_bars(&[10.0, 20.0, 30.0]);
        let (upper, middle, _) = bollinger_bands(&bars, 3, 1.234)[2].unwrap();
        let stddev = (200.0_f64 / 3.0).sqrt();
        assert!((upper - middle - 1.234 * stddev).abs() < 1e-10);

        let (upper, middle, lower) = bollinger_bands(&bars, 3, 0.004)[2].unwrap();
        assert!(upper > middle && lower < middle);
    }

    #[test]
    fn bollinger_indicator_type() {
        let series = calculate_bollinger(&test_bars(&[10.0]), DEFAULT_PERIOD, 200);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 200
            }
        );
    }
}

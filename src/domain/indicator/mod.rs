//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every series is aligned 1:1 with the input bars. Points inside the warm-up
//! window carry `valid == false` and must not be read as values.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    /// The scalar value of a valid `Simple` point.
    pub fn simple(&self) -> Option<f64> {
        match self.value {
            IndicatorValue::Simple(v) if self.valid => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Roc(usize),
    Stddev(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorType {
    /// Number of bars needed before the first valid value.
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorType::Sma(n) | IndicatorType::Ema(n) | IndicatorType::Stddev(n) => *n,
            IndicatorType::Rsi(n) | IndicatorType::Roc(n) => n + 1,
            IndicatorType::Macd { fast, slow, signal } => {
                (*fast.max(slow) + signal).saturating_sub(1)
            }
            IndicatorType::Bollinger { period, .. } => *period,
        }
    }

    /// Whether every period parameter is positive.
    pub fn has_valid_periods(&self) -> bool {
        match self {
            IndicatorType::Sma(n)
            | IndicatorType::Ema(n)
            | IndicatorType::Stddev(n)
            | IndicatorType::Rsi(n)
            | IndicatorType::Roc(n) => *n > 0,
            IndicatorType::Macd { fast, slow, signal } => *fast > 0 && *slow > 0 && *signal > 0,
            IndicatorType::Bollinger { period, .. } => *period > 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Scalar values with `None` for warm-up points.
    pub fn simple_values(&self) -> Vec<Option<f64>> {
        self.values.iter().map(IndicatorPoint::simple).collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_bars(closes: &[f64]) -> Vec<crate::domain::ohlcv::OhlcvBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            crate::domain::ohlcv::OhlcvBar::from_close(
                start + chrono::Duration::days(i as i64),
                close,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,2)");
    }

    #[test]
    fn lookback_matches_first_valid_index() {
        let bars = test_bars(&(0..60).map(|i| 100.0 + (i % 7) as f64).collect::<Vec<_>>());
        let types = [
            IndicatorType::Sma(5),
            IndicatorType::Ema(5),
            IndicatorType::Stddev(5),
            IndicatorType::Rsi(14),
            IndicatorType::Roc(10),
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 200,
            },
        ];
        let computed = crate::domain::indicator_helpers::compute_indicators(&bars, &types);
        for t in &types {
            let series = &computed[t];
            let first_valid = series.values.iter().position(|p| p.valid).unwrap();
            assert_eq!(first_valid + 1, t.lookback(), "lookback mismatch for {}", t);
        }
    }

    #[test]
    fn simple_ignores_invalid_points() {
        let point = IndicatorPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            valid: false,
            value: IndicatorValue::Simple(3.0),
        };
        assert_eq!(point.simple(), None);
    }
}

//! Batch indicator computation shared by strategies and rule evaluation.

use std::collections::HashMap;

use crate::domain::indicator::{
    IndicatorSeries, IndicatorType, calculate_bollinger, calculate_ema, calculate_macd,
    calculate_roc, calculate_rsi, calculate_sma, calculate_stddev,
};
use crate::domain::ohlcv::OhlcvBar;

/// Computes a single indicator over `bars`.
pub fn compute_indicator(bars: &[OhlcvBar], indicator_type: &IndicatorType) -> IndicatorSeries {
    match *indicator_type {
        IndicatorType::Sma(n) => calculate_sma(bars, n),
        IndicatorType::Ema(n) => calculate_ema(bars, n),
        IndicatorType::Rsi(n) => calculate_rsi(bars, n),
        IndicatorType::Roc(n) => calculate_roc(bars, n),
        IndicatorType::Stddev(n) => calculate_stddev(bars, n),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(bars, period, stddev_mult_x100),
    }
}

/// Computes each distinct indicator once, keyed by its type.
pub fn compute_indicators(
    bars: &[OhlcvBar],
    indicator_types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(indicator_types.len());
    for t in indicator_types {
        if !out.contains_key(t) {
            out.insert(t.clone(), compute_indicator(bars, t));
        }
    }
    out
}

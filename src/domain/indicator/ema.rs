//! Exponential Moving Average indicator.
//!
//! Smoothing factor k = 2/(span+1). The average is seeded with the SMA of the
//! first `span` values, then EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (span-1) values are undefined.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = bars
        .iter()
        .zip(ema_values(&closes, period))
        .map(|(bar, ema)| IndicatorPoint {
            date: bar.date,
            valid: ema.is_some(),
            value: IndicatorValue::Simple(ema.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// SMA-seeded EMA over raw values. Shared with the MACD signal line.
pub(crate) fn ema_values(input: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; input.len()];
    if span == 0 || input.len() < span {
        return out;
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut ema = input[..span].iter().sum::<f64>() / span as f64;
    out[span - 1] = Some(ema);

    for i in span..input.len() {
        ema = input[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }

    out
}

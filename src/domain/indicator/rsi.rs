//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss:
//! - First average: simple mean of the first n gains/losses
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! avg_loss == 0 with gains gives 100. A window with no movement at all has
//! no defined RSI and is reported invalid.
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    match (avg_gain == 0.0, avg_loss == 0.0) {
        (true, true) => None,
        (false, true) => Some(100.0),
        _ => Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss)),
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut rsi: Vec<Option<f64>> = vec![None; bars.len()];

    if period > 0 && bars.len() > period {
        let (gains, losses): (Vec<f64>, Vec<f64>) = bars
            .windows(2)
            .map(|w| {
                let change = w[1].close - w[0].close;
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        let n = period as f64;
        let mut avg_gain = gains[..period].iter().sum::<f64>() / n;
        let mut avg_loss = losses[..period].iter().sum::<f64>() / n;
        rsi[period] = rsi_from_averages(avg_gain, avg_loss);

        for i in period..gains.len() {
            avg_gain = (avg_gain * (n - 1.0) + gains[i]) / n;
            avg_loss = (avg_loss * (n - 1.0) + losses[i]) / n;
            rsi[i + 1] = rsi_from_averages(avg_gain, avg_loss);
        }
    }

    let values = bars
        .iter()
        .zip(rsi)
        .map(|(bar, value)| IndicatorPoint {
            date: bar.date,
            valid: value.is_some(),
            value: IndicatorValue::Simple(value.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

//! ROC (Rate of Change) indicator.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! Warmup: first n bars invalid. A zero reference close leaves the point invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_roc(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let roc = if period > 0 && i >= period {
                let reference = bars[i - period].close;
                (reference != 0.0).then(|| (bar.close - reference) / reference * 100.0)
            } else {
                None
            };
            IndicatorPoint {
                date: bar.date,
                valid: roc.is_some(),
                value: IndicatorValue::Simple(roc.unwrap_or(0.0)),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Roc(period),
        values,
    }
}

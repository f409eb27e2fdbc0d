//! Signal generation for the built-in strategy variants.
//!
//! Every variant emits `Long`/`Flat`/`Short`. A bar whose indicators are
//! still warming up is `Flat`.

use crate::domain::error::QtraderError;
use crate::domain::indicator::bollinger::bollinger_bands;
use crate::domain::indicator::{
    IndicatorValue, calculate_ema, calculate_macd, calculate_roc,
    calculate_rsi, calculate_sma,
};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::{Signal, SignalPoint, SignalSeries};
use crate::domain::strategy::Strategy;

/// Fails with `InsufficientData` when the series is shorter than `minimum`.
pub(crate) fn ensure_min_bars(series: &PriceSeries, minimum: usize) -> Result<(), QtraderError> {
    if series.len() < minimum {
        return Err(QtraderError::InsufficientData {
            bars: series.len(),
            minimum,
        });
    }
    Ok(())
}

/// Pairs each signal with the date of the bar it was computed on.
pub(crate) fn to_series(series: &PriceSeries, signals: Vec<Signal>) -> SignalSeries {
    SignalSeries::new(
        series
            .bars()
            .iter()
            .zip(signals)
            .map(|(bar, signal)| SignalPoint {
                date: bar.date,
                signal,
            })
            .collect(),
    )
}

/// Maps each pair of defined values through `rule`; undefined bars are Flat.
fn pairwise(
    a: &[Option<f64>],
    b: &[Option<f64>],
    rule: impl Fn(f64, f64) -> Signal,
) -> Vec<Signal> {
    a.iter()
        .zip(b)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => rule(*a, *b),
            _ => Signal::Flat,
        })
        .collect()
}

/// Computes the signal series for `strategy` over `series`.
pub fn evaluate(series: &PriceSeries, strategy: &Strategy) -> Result<SignalSeries, QtraderError> {
    strategy.validate()?;
    ensure_min_bars(series, strategy.min_bars())?;

    let bars = series.bars();

    let signals = match *strategy {
        Strategy::SmaCrossover { short, long } => pairwise(
            &calculate_sma(bars, short).simple_values(),
            &calculate_sma(bars, long).simple_values(),
            |s, l| if s > l { Signal::Long } else { Signal::Short },
        ),
        Strategy::EmaCrossover { short, long } => pairwise(
            &calculate_ema(bars, short).simple_values(),
            &calculate_ema(bars, long).simple_values(),
            |s, l| if s > l { Signal::Long } else { Signal::Flat },
        ),
        Strategy::DualSma { short, long } => pairwise(
            &calculate_sma(bars, short).simple_values(),
            &calculate_sma(bars, long).simple_values(),
            Signal::from_ordering,
        ),
        Strategy::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal)
            .values
            .iter()
            .map(|p| match p.value {
                IndicatorValue::Macd { line, signal, .. } if p.valid => {
                    Signal::from_ordering(line, signal)
                }
                _ => Signal::Flat,
            })
            .collect(),
        Strategy::Bollinger { period, k } => bollinger_bands(bars, period, k)
            .into_iter()
            .zip(bars)
            .map(|(b, bar)| match b {
                Some((upper, _, lower)) => {
                    if bar.close < lower {
                        Signal::Long
                    } else if bar.close > upper {
                        Signal::Short
                    } else {
                        Signal::Flat
                    }
                }
                None => Signal::Flat,
            })
            .collect(),
        Strategy::Momentum { period, threshold } => calculate_roc(bars, period)
            .simple_values()
            .into_iter()
            .map(|roc| match roc {
                Some(r) if r > threshold => Signal::Long,
                Some(r) if r < -threshold => Signal::Short,
                _ => Signal::Flat,
            })
            .collect(),
        Strategy::RsiThreshold {
            period,
            lower,
            upper,
        } => calculate_rsi(bars, period)
            .simple_values()
            .into_iter()
            .map(|rsi| match rsi {
                Some(r) if r < lower => Signal::Long,
                Some(r) if r > upper => Signal::Short,
                _ => Signal::Flat,
            })
            .collect(),
        Strategy::RsiSma {
            rsi_period,
            short,
            entry_below,
            exit_above,
        } => {
            let rsi = calculate_rsi(bars, rsi_period).simple_values();
            let sma = calculate_sma(bars, short).simple_values();
            let mut state = Signal::Flat;
            rsi.iter()
                .zip(&sma)
                .zip(bars)
                .map(|((rsi, sma), bar)| {
                    if let (Some(r), Some(m)) = (rsi, sma) {
                        if *r < entry_below && bar.close > *m {
                            state = Signal::Long;
                        } else if *r > exit_above && bar.close < *m {
                            state = Signal::Flat;
                        }
                    }
                    state
                })
                .collect()
        }
    };

    Ok(to_series(series, signals))
}

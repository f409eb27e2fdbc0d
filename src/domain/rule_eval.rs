//! Rule evaluation against bars and pre-computed indicators.
//!
//! # Evaluation Semantics
//!
//! - Comparison rules evaluate at the given bar index
//! - An operand with no value (warm-up, missing OHLC field, NaN) makes every
//!   comparison involving it `false`
//! - `CROSS_ABOVE`/`CROSS_BELOW` need `index >= 1` and values on both bars
//! - `AND` short-circuits on the first `false`, `OR` on the first `true`
//! - `CONSECUTIVE(rule, N)`: child true for N consecutive bars ending at index
//! - `ANY_OF(rule, N)`: child true at least once in the last N bars

use std::collections::HashMap;

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::rule::{IndicatorField, IndicatorRef, Operand, Rule};

const EPSILON: f64 = 1e-9;

pub fn evaluate(
    rule: &Rule,
    bars: &[OhlcvBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    index: usize,
) -> bool {
    let value = |operand: &Operand, i: usize| resolve_operand(operand, bars, indicators, i);
    let pair = |left: &Operand, right: &Operand, i: usize| value(left, i).zip(value(right, i));

    match rule {
        Rule::CrossAbove { left, right } => {
            if index == 0 {
                return false;
            }
            match (pair(left, right, index - 1), pair(left, right, index)) {
                (Some((lp, rp)), Some((lc, rc))) => lp <= rp && lc > rc,
                _ => false,
            }
        }
        Rule::CrossBelow { left, right } => {
            if index == 0 {
                return false;
            }
            match (pair(left, right, index - 1), pair(left, right, index)) {
                (Some((lp, rp)), Some((lc, rc))) => lp >= rp && lc < rc,
                _ => false,
            }
        }
        Rule::Above { left, right } => pair(left, right, index).is_some_and(|(l, r)| l > r),
        Rule::Below { left, right } => pair(left, right, index).is_some_and(|(l, r)| l < r),
        Rule::Equals { left, right } => {
            pair(left, right, index).is_some_and(|(l, r)| (l - r).abs() < EPSILON)
        }
        Rule::Between {
            operand,
            lower,
            upper,
        } => value(operand, index).is_some_and(|v| v >= *lower && v <= *upper),
        Rule::And(rules) => rules.iter().all(|r| evaluate(r, bars, indicators, index)),
        Rule::Or(rules) => rules.iter().any(|r| evaluate(r, bars, indicators, index)),
        Rule::Not(rule) => !evaluate(rule, bars, indicators, index),
        Rule::Consecutive { rule, count } => {
            if *count == 0 || index + 1 < *count {
                return false;
            }
            (index + 1 - *count..=index).all(|i| evaluate(rule, bars, indicators, i))
        }
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return false;
            }
            let start = index.saturating_sub(*count - 1);
            (start..=index).any(|i| evaluate(rule, bars, indicators, i))
        }
    }
}

fn resolve_operand(
    operand: &Operand,
    bars: &[OhlcvBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    index: usize,
) -> Option<f64> {
    let bar = bars.get(index)?;
    let v = match operand {
        Operand::Open => bar.open?,
        Operand::High => bar.high?,
        Operand::Low => bar.low?,
        Operand::Close => bar.close,
        Operand::Volume => bar.volume?,
        Operand::Constant(v) => *v,
        Operand::Indicator(ind_ref) => resolve_indicator(ind_ref, indicators, index)?,
    };
    (!v.is_nan()).then_some(v)
}

fn resolve_indicator(
    ind_ref: &IndicatorRef,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    index: usize,
) -> Option<f64> {
    let point = indicators
        .get(&ind_ref.indicator_type)?
        .values
        .get(index)
        .filter(|p| p.valid)?;

    match (&point.value, ind_ref.field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => Some(*v),
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine) => Some(*line),
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => Some(*signal),
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => {
            Some(*histogram)
        }
        (IndicatorValue::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => Some(*upper),
        (IndicatorValue::Bollinger { middle, .. }, IndicatorField::BollingerMiddle) => {
            Some(*middle)
        }
        (IndicatorValue::Bollinger { lower, .. }, IndicatorField::BollingerLower) => Some(*lower),
        _ => None,
    }
}

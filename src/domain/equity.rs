//! Equity curves.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::QtraderError;
use crate::domain::price_series::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Account value per bar, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new(points: Vec<EquityPoint>) -> Self {
        Self { points }
    }

    /// Holds the series from the first bar: `capital * close[t] / close[0]`.
    pub fn buy_and_hold(series: &PriceSeries, initial_capital: f64) -> Result<Self, QtraderError> {
        check_capital(initial_capital)?;
        let first = series.bars()[0].close;
        Ok(Self::new(
            series
                .bars()
                .iter()
                .map(|bar| EquityPoint {
                    date: bar.date,
                    equity: initial_capital * bar.close / first,
                })
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&EquityPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    /// Equity on `date`, if the curve has a point there.
    pub fn equity_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].equity)
    }
}

pub(crate) fn check_capital(initial_capital: f64) -> Result<(), QtraderError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(QtraderError::parameter(
            "initial_capital",
            format!("must be a positive number, got {}", initial_capital),
        ));
    }
    Ok(())
}

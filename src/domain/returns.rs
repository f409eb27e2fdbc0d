//! Per-bar market and strategy returns, compounded into equity.

use crate::domain::equity::{EquityCurve, EquityPoint, check_capital};
use crate::domain::error::QtraderError;
use crate::domain::position::PositionSeries;
use crate::domain::price_series::PriceSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct Returns {
    /// `close[t] / close[t-1] - 1`, with 0 on the first bar.
    pub market_returns: Vec<f64>,
    /// `market_returns[t] * position[t]`.
    pub strategy_returns: Vec<f64>,
    pub equity: EquityCurve,
}

pub fn compute_returns(
    series: &PriceSeries,
    positions: &PositionSeries,
    initial_capital: f64,
) -> Result<Returns, QtraderError> {
    check_capital(initial_capital)?;

    let bars = series.bars();
    if positions.len() != bars.len() {
        return Err(QtraderError::data(format!(
            "position series has {} points but price series has {} bars",
            positions.len(),
            bars.len()
        )));
    }
    if let Some((bar, point)) = bars
        .iter()
        .zip(&positions.points)
        .find(|(bar, point)| bar.date != point.date)
    {
        return Err(QtraderError::data(format!(
            "position dated {} does not line up with bar dated {}",
            point.date, bar.date
        )));
    }

    let market_returns: Vec<f64> = std::iter::once(0.0)
        .chain(bars.windows(2).map(|w| w[1].close / w[0].close - 1.0))
        .collect();

    let strategy_returns: Vec<f64> = market_returns
        .iter()
        .zip(&positions.points)
        .map(|(r, p)| r * p.position.exposure())
        .collect();

    let mut equity = initial_capital;
    let points = bars
        .iter()
        .zip(&strategy_returns)
        .map(|(bar, r)| {
            equity *= 1.0 + r;
            EquityPoint {
                date: bar.date,
                equity,
            }
        })
        .collect();

    Ok(Returns {
        market_returns,
        strategy_returns,
        equity: EquityCurve::new(points),
    })
}

//! Single-strategy backtest pipeline.
//!
//! signals -> lagged positions -> returns and equity -> metrics, plus the
//! trade log and its equity markers. Errors surface directly to the caller.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::equity::EquityCurve;
use crate::domain::error::QtraderError;
use crate::domain::metrics::Metrics;
use crate::domain::position::{PositionSeries, simulate_positions};
use crate::domain::price_series::PriceSeries;
use crate::domain::returns::{Returns, compute_returns};
use crate::domain::signal::SignalSeries;
use crate::domain::strategy::SignalGenerator;
use crate::domain::trade_log::{TradeLog, TradeMarker, build_markers, build_trade_log};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    /// Annual rate, e.g. 0.05.
    pub risk_free_rate: f64,
    /// Symbol whose buy-and-hold curve is the alpha benchmark.
    pub benchmark: Option<String>,
}

impl BacktestConfig {
    pub fn new(symbol: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start_date,
            end_date,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: 0.0,
            benchmark: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub signals: SignalSeries,
    pub positions: PositionSeries,
    pub returns: Returns,
    pub equity: EquityCurve,
    pub metrics: Metrics,
    pub trades: TradeLog,
    pub markers: Vec<TradeMarker>,
}

pub fn run_backtest(
    series: &PriceSeries,
    generator: &dyn SignalGenerator,
    config: &BacktestConfig,
    benchmark: Option<&EquityCurve>,
) -> Result<BacktestResult, QtraderError> {
    debug!(
        strategy = generator.name(),
        symbol = series.symbol(),
        bars = series.len(),
        "running backtest"
    );

    let signals = generator.generate(series)?;
    if signals.len() != series.len() {
        return Err(QtraderError::data(format!(
            "strategy '{}' produced {} signals for {} bars",
            generator.name(),
            signals.len(),
            series.len()
        )));
    }

    let positions = simulate_positions(&signals);
    let returns = compute_returns(series, &positions, config.initial_capital)?;
    let equity = returns.equity.clone();

    let mut metrics = Metrics::compute(&equity, config.risk_free_rate)?;
    if let Some(benchmark) = benchmark {
        metrics = metrics.with_benchmark(&equity, benchmark)?;
    }

    let trades = build_trade_log(series, &signals);
    let markers = build_markers(&trades, &equity);

    info!(
        strategy = generator.name(),
        total_return = metrics.total_return,
        trades = trades.len(),
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy: generator.name().to_string(),
        signals,
        positions,
        returns,
        equity,
        metrics,
        trades,
        markers,
    })
}

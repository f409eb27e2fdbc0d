//! Buy/sell events derived from signal transitions.
//!
//! Only the long side is logged: entering Long is a BUY, leaving Long is a
//! SELL. Moves between Flat and Short produce no entry.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::equity::EquityCurve;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::{Signal, SignalSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeAction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeEntry {
    pub date: NaiveDate,
    pub action: TradeAction,
    /// Close on the transition bar.
    pub price: f64,
}

pub type TradeLog = Vec<TradeEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerKind {
    Buy,
    Sell,
}

/// A trade event placed on the equity curve for plotting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeMarker {
    pub date: NaiveDate,
    pub equity: f64,
    #[serde(rename = "type")]
    pub kind: MarkerKind,
}

pub fn build_trade_log(series: &PriceSeries, signals: &SignalSeries) -> TradeLog {
    signals
        .points
        .windows(2)
        .zip(series.bars().iter().skip(1))
        .filter_map(|(pair, bar)| {
            let action = match (pair[0].signal, pair[1].signal) {
                (p, Signal::Long) if p != Signal::Long => TradeAction::Buy,
                (Signal::Long, c) if c != Signal::Long => TradeAction::Sell,
                _ => return None,
            };
            Some(TradeEntry {
                date: pair[1].date,
                action,
                price: bar.close,
            })
        })
        .collect()
}

/// Equity at each trade date. Trades on dates missing from the curve are dropped.
pub fn build_markers(trades: &TradeLog, equity: &EquityCurve) -> Vec<TradeMarker> {
    trades
        .iter()
        .filter_map(|t| {
            equity.equity_on(t.date).map(|value| TradeMarker {
                date: t.date,
                equity: value,
                kind: match t.action {
                    TradeAction::Buy => MarkerKind::Buy,
                    TradeAction::Sell => MarkerKind::Sell,
                },
            })
        })
        .collect()
}

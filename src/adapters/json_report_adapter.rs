//! JSON report adapter.
//!
//! Return-type metrics are written in percent; undefined values (NaN) are
//! written as `null`.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::comparator::Comparison;
use crate::domain::equity::EquityCurve;
use crate::domain::error::{ExcludedStrategy, QtraderError};
use crate::domain::metrics::Metrics;
use crate::domain::trade_log::{TradeEntry, TradeMarker};
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub total_return: Option<f64>,
    pub annual_return: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_vs_benchmark: Option<f64>,
}

impl From<&Metrics> for MetricsRecord {
    fn from(m: &Metrics) -> Self {
        MetricsRecord {
            total_return: percent(m.total_return),
            annual_return: percent(m.annual_return),
            sharpe_ratio: defined(m.sharpe_ratio),
            max_drawdown: percent(m.max_drawdown),
            alpha_vs_benchmark: m.alpha_vs_benchmark.and_then(percent),
        }
    }
}

fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn percent(value: f64) -> Option<f64> {
    defined(value * 100.0)
}

#[derive(Serialize)]
struct BacktestReport<'a> {
    strategy: &'a str,
    metrics: MetricsRecord,
    equity: &'a EquityCurve,
    trades: &'a [TradeEntry],
    markers: &'a [TradeMarker],
}

#[derive(Serialize)]
struct ComparisonReport<'a> {
    equities: BTreeMap<&'a str, &'a EquityCurve>,
    metrics: BTreeMap<&'a str, MetricsRecord>,
    best: Option<&'a str>,
    excluded: &'a [ExcludedStrategy],
}

#[derive(Serialize)]
struct FailureReport<'a> {
    error: String,
    excluded: &'a [ExcludedStrategy],
}

pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn emit<T: Serialize>(&self, value: &T, out: &mut dyn Write) -> Result<(), QtraderError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, value)?;
        } else {
            serde_json::to_writer(&mut *out, value)?;
        }
        writeln!(out)?;
        Ok(())
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        out: &mut dyn Write,
    ) -> Result<(), QtraderError> {
        let report = BacktestReport {
            strategy: &result.strategy,
            metrics: MetricsRecord::from(&result.metrics),
            equity: &result.equity,
            trades: &result.trades,
            markers: &result.markers,
        };
        self.emit(&report, out)
    }

    fn write_comparison(
        &self,
        comparison: &Comparison,
        out: &mut dyn Write,
    ) -> Result<(), QtraderError> {
        let report = ComparisonReport {
            equities: comparison
                .runs
                .iter()
                .map(|run| (run.id.as_str(), &run.result.equity))
                .collect(),
            metrics: comparison
                .runs
                .iter()
                .map(|run| (run.id.as_str(), MetricsRecord::from(&run.result.metrics)))
                .collect(),
            best: comparison.best.as_deref(),
            excluded: &comparison.excluded,
        };
        self.emit(&report, out)
    }

    fn write_comparison_failure(
        &self,
        excluded: &[ExcludedStrategy],
        out: &mut dyn Write,
    ) -> Result<(), QtraderError> {
        let report = FailureReport {
            error: "no valid strategies were processed".to_string(),
            excluded,
        };
        self.emit(&report, out)
    }

    fn write_metrics(&self, metrics: &Metrics, out: &mut dyn Write) -> Result<(), QtraderError> {
        self.emit(&MetricsRecord::from(metrics), out)
    }
}

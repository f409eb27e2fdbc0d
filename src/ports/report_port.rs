//! Report output port.

use std::io::Write;

use crate::domain::backtest::BacktestResult;
use crate::domain::comparator::Comparison;
use crate::domain::error::{ExcludedStrategy, QtraderError};
use crate::domain::metrics::Metrics;

pub trait ReportPort {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        out: &mut dyn Write,
    ) -> Result<(), QtraderError>;

    fn write_comparison(
        &self,
        comparison: &Comparison,
        out: &mut dyn Write,
    ) -> Result<(), QtraderError>;

    /// A comparison where every strategy was excluded.
    fn write_comparison_failure(
        &self,
        excluded: &[ExcludedStrategy],
        out: &mut dyn Write,
    ) -> Result<(), QtraderError>;

    fn write_metrics(&self, metrics: &Metrics, out: &mut dyn Write) -> Result<(), QtraderError>;
}

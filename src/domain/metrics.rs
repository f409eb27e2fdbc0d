//! Performance metrics over an equity curve.
//!
//! All values are fractions (0.05 = 5%). Undefined statistics are NaN
//! rather than errors, so a flat strategy still produces a report.

use chrono::NaiveDate;

use crate::domain::equity::EquityCurve;
use crate::domain::error::QtraderError;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;
/// Standard deviations at or below this are treated as zero.
pub const ZERO_STDDEV: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    /// CAGR over calendar days.
    pub annual_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub alpha_vs_benchmark: Option<f64>,
}

impl Metrics {
    /// Fails with `Data` on an empty curve or a non-positive starting value.
    pub fn compute(curve: &EquityCurve, risk_free_rate: f64) -> Result<Self, QtraderError> {
        let first = curve
            .first()
            .ok_or_else(|| QtraderError::data("equity curve is empty"))?;
        if !first.equity.is_finite() || first.equity <= 0.0 {
            return Err(QtraderError::data(format!(
                "equity curve must start positive, got {}",
                first.equity
            )));
        }

        let values = curve.values();
        Ok(Metrics {
            total_return: total_return(&values),
            annual_return: annual_return(curve),
            sharpe_ratio: sharpe_ratio(&values, risk_free_rate),
            max_drawdown: max_drawdown(&values),
            alpha_vs_benchmark: None,
        })
    }

    /// Adds [`alpha`] against `benchmark`.
    pub fn with_benchmark(
        mut self,
        curve: &EquityCurve,
        benchmark: &EquityCurve,
    ) -> Result<Self, QtraderError> {
        self.alpha_vs_benchmark = Some(alpha(curve, benchmark)?);
        Ok(self)
    }
}

/// `final / initial - 1`; NaN with fewer than two points.
pub fn total_return(values: &[f64]) -> f64 {
    match values {
        [first, .., last] => last / first - 1.0,
        _ => f64::NAN,
    }
}

/// Compound annual growth rate over `(last_date - first_date) / 365.25`
/// years. NaN with fewer than two points or a zero span; -1 once the curve
/// has lost everything.
pub fn annual_return(curve: &EquityCurve) -> f64 {
    let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
        return f64::NAN;
    };
    let days = (last.date - first.date).num_days();
    if curve.len() < 2 || days <= 0 {
        return f64::NAN;
    }
    let growth = last.equity / first.equity;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(CALENDAR_DAYS_PER_YEAR / days as f64) - 1.0
}

/// Bar-over-bar percent changes of the curve. Steps from a zero value are
/// undefined and skipped.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualised Sharpe ratio of daily returns in excess of `risk_free_rate / 252`,
/// using the sample standard deviation. NaN with fewer than two returns or
/// zero variance.
pub fn sharpe_ratio(values: &[f64], risk_free_rate: f64) -> f64 {
    let returns = period_returns(values);
    if returns.len() < 2 {
        return f64::NAN;
    }
    let n = returns.len() as f64;
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let mean = returns.iter().sum::<f64>() / n - daily_rf;
    let variance = returns
        .iter()
        .map(|r| (r - daily_rf - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let stddev = variance.sqrt();
    if !stddev.is_finite() || stddev <= ZERO_STDDEV {
        return f64::NAN;
    }
    mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline as a fraction of the running peak, in `[0, 1]`.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            worst = worst.max((peak - v) / peak);
        }
    }
    worst.clamp(0.0, 1.0)
}

/// Inner join of two curves on date: `(date, a, b)` for dates present in both.
pub fn align_curves(a: &EquityCurve, b: &EquityCurve) -> Vec<(NaiveDate, f64, f64)> {
    a.points
        .iter()
        .filter_map(|p| b.equity_on(p.date).map(|other| (p.date, p.equity, other)))
        .collect()
}

/// Relative outperformance of the final values over the shared dates:
/// `(strategy - benchmark) / benchmark`.
pub fn alpha(curve: &EquityCurve, benchmark: &EquityCurve) -> Result<f64, QtraderError> {
    let aligned = align_curves(curve, benchmark);
    let &(date, strategy, bench) = aligned.last().ok_or_else(|| {
        QtraderError::computation("strategy and benchmark curves share no dates")
    })?;
    if bench == 0.0 || !bench.is_finite() {
        return Err(QtraderError::computation(format!(
            "benchmark equity on {} is {}, alpha is undefined",
            date, bench
        )));
    }
    Ok((strategy - bench) / bench)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equity::EquityPoint;
    use approx::assert_relative_eq;

    fn curve_from(start: NaiveDate, values: &[f64]) -> EquityCurve {
        EquityCurve::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &equity)| EquityPoint {
                    date: start + chrono::Duration::days(i as i64),
                    equity,
                })
                .collect(),
        )
    }

    fn curve(values: &[f64]) -> EquityCurve {
        curve_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), values)
    }

    #[test]
    fn total_return_basic() {
        assert_relative_eq!(total_return(&[100.0, 150.0, 120.0]), 0.2, epsilon = 1e-12);
        assert!(total_return(&[100.0]).is_nan());
    }

    #[test]
    fn annual_return_over_one_year() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = start + chrono::Duration::days(365);
        let c = EquityCurve::new(vec![
            EquityPoint {
                date: start,
                equity: 100.0,
            },
            EquityPoint {
                date: end,
                equity: 110.0,
            },
        ]);
        let expected = 1.1_f64.powf(365.25 / 365.0) - 1.0;
        assert_relative_eq!(annual_return(&c), expected, epsilon = 1e-12);
    }

    #[test]
    fn annual_return_undefined_cases() {
        assert!(annual_return(&curve(&[100.0])).is_nan());
        assert!(annual_return(&EquityCurve::default()).is_nan());
        assert_eq!(annual_return(&curve(&[100.0, 0.0])), -1.0);
    }

    #[test]
    fn sharpe_nan_for_constant_returns() {
        assert!(sharpe_ratio(&[100.0; 10], 0.0).is_nan());
        let growing: Vec<f64> = (0..10).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        assert!(sharpe_ratio(&growing, 0.0).is_nan());
    }

    #[test]
    fn sharpe_nan_with_too_few_returns() {
        assert!(sharpe_ratio(&[100.0, 101.0], 0.0).is_nan());
        assert!(sharpe_ratio(&[100.0], 0.0).is_nan());
    }

    #[test]
    fn sharpe_matches_sample_formula() {
        let values = [100.0, 102.0, 101.0, 104.0, 103.0];
        let returns: Vec<f64> = values.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let sd = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
        assert_relative_eq!(
            sharpe_ratio(&values, 0.0),
            mean / sd * 252f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn risk_free_rate_lowers_sharpe() {
        let values = [100.0, 102.0, 101.0, 104.0, 103.0];
        assert!(sharpe_ratio(&values, 0.05) < sharpe_ratio(&values, 0.0));
    }

    #[test]
    fn max_drawdown_cases() {
        assert_eq!(max_drawdown(&[100.0, 110.0, 120.0]), 0.0);
        assert_relative_eq!(max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]), 0.25);
        assert_eq!(max_drawdown(&[100.0, 0.0]), 1.0);
        assert_eq!(max_drawdown(&[100.0, -20.0]), 1.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn alpha_scenario() {
        let strategy = curve(&[100_000.0, 104_000.0, 110_000.0]);
        let benchmark = curve(&[100_000.0, 102_000.0, 105_000.0]);
        let a = alpha(&strategy, &benchmark).unwrap();
        assert_relative_eq!(a * 100.0, 4.761904761904762, epsilon = 1e-9);
    }

    #[test]
    fn alpha_uses_last_shared_date() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let strategy = curve_from(start, &[100.0, 120.0, 130.0]);
        let benchmark = curve_from(start - chrono::Duration::days(1), &[100.0, 100.0, 110.0]);
        // shared dates: day 0 and day 1 of the strategy
        let a = alpha(&strategy, &benchmark).unwrap();
        assert_relative_eq!(a, 120.0 / 110.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn alpha_without_overlap_is_computation_error() {
        let strategy = curve_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &[1.0, 2.0]);
        let benchmark = curve_from(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), &[1.0, 2.0]);
        assert!(matches!(
            alpha(&strategy, &benchmark),
            Err(QtraderError::Computation { .. })
        ));
    }

    #[test]
    fn alpha_with_zero_benchmark_is_computation_error() {
        assert!(matches!(
            alpha(&curve(&[1.0, 2.0]), &curve(&[1.0, 0.0])),
            Err(QtraderError::Computation { .. })
        ));
    }

    #[test]
    fn compute_rejects_empty_and_non_positive_start() {
        assert!(matches!(
            Metrics::compute(&EquityCurve::default(), 0.0),
            Err(QtraderError::Data { .. })
        ));
        assert!(Metrics::compute(&curve(&[0.0, 1.0]), 0.0).is_err());
    }

    #[test]
    fn compute_flat_curve() {
        let m = Metrics::compute(&curve(&[100.0; 30]), 0.0).unwrap();
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.annual_return, 0.0);
        assert!(m.sharpe_ratio.is_nan());
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.alpha_vs_benchmark, None);
    }

    #[test]
    fn with_benchmark_sets_alpha() {
        let c = curve(&[100.0, 110.0]);
        let m = Metrics::compute(&c, 0.0)
            .unwrap()
            .with_benchmark(&c, &curve(&[100.0, 100.0]))
            .unwrap();
        assert_relative_eq!(m.alpha_vs_benchmark.unwrap(), 0.1, epsilon = 1e-12);
    }
}

//! Runs several strategies over one price series and ranks them by total
//! return.
//!
//! A strategy that fails is excluded from the result with its reason; the
//! batch only fails when nothing survives.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::equity::EquityCurve;
use crate::domain::error::{ExcludedStrategy, QtraderError};
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::{self, SignalGenerator, StrategyParams, StrategySpec};

#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub id: String,
    pub result: BacktestResult,
}

#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Successful runs, in input order.
    pub runs: Vec<StrategyRun>,
    pub excluded: Vec<ExcludedStrategy>,
    /// Id of the run with the highest total return.
    pub best: Option<String>,
}

impl Comparison {
    pub fn get(&self, id: &str) -> Option<&StrategyRun> {
        self.runs.iter().find(|run| run.id == id)
    }

    pub fn best_run(&self) -> Option<&StrategyRun> {
        self.best.as_deref().and_then(|id| self.get(id))
    }
}

type Candidate = (String, Result<Arc<dyn SignalGenerator>, QtraderError>);

pub struct StrategyComparator {
    config: BacktestConfig,
}

impl StrategyComparator {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn compare(
        &self,
        series: &PriceSeries,
        benchmark: Option<&EquityCurve>,
        specs: &[StrategySpec],
    ) -> Result<Comparison, QtraderError> {
        let candidates = specs
            .iter()
            .map(|spec| (spec.id.clone(), Ok(Arc::clone(&spec.generator))))
            .collect();
        self.run(series, benchmark, candidates)
    }

    /// Resolves `ids` against `params` first; ids that do not resolve are
    /// excluded like any other failure.
    pub fn compare_ids(
        &self,
        series: &PriceSeries,
        benchmark: Option<&EquityCurve>,
        ids: &[String],
        params: &StrategyParams,
    ) -> Result<Comparison, QtraderError> {
        let candidates = ids
            .iter()
            .map(|id| {
                let generator = strategy::resolve(id, params).map(|spec| spec.generator);
                (id.clone(), generator)
            })
            .collect();
        self.run(series, benchmark, candidates)
    }

    fn run(
        &self,
        series: &PriceSeries,
        benchmark: Option<&EquityCurve>,
        candidates: Vec<Candidate>,
    ) -> Result<Comparison, QtraderError> {
        if candidates.is_empty() {
            return Ok(Comparison::default());
        }

        let mut seen = HashSet::new();
        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .map(|(id, generator)| {
                if seen.insert(id.clone()) {
                    (id, generator)
                } else {
                    let err = QtraderError::parameter(
                        "strategies",
                        format!("duplicate strategy id '{}'", id),
                    );
                    (id, Err(err))
                }
            })
            .collect();

        let outcomes: Vec<(String, Result<BacktestResult, QtraderError>)> = candidates
            .into_par_iter()
            .map(|(id, generator)| {
                let outcome = generator.and_then(|generator| {
                    run_backtest(series, generator.as_ref(), &self.config, benchmark)
                });
                (id, outcome)
            })
            .collect();

        let mut comparison = Comparison::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(result) => comparison.runs.push(StrategyRun { id, result }),
                Err(err) => {
                    warn!(strategy = %id, error = %err, "strategy excluded");
                    comparison.excluded.push(ExcludedStrategy {
                        id,
                        kind: err.kind(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if comparison.runs.is_empty() {
            return Err(QtraderError::NoValidStrategies {
                excluded: comparison.excluded,
            });
        }

        comparison.best = best_by_total_return(&comparison.runs);
        info!(
            runs = comparison.runs.len(),
            excluded = comparison.excluded.len(),
            best = comparison.best.as_deref().unwrap_or("-"),
            "comparison complete"
        );
        Ok(comparison)
    }
}

/// Highest total return; the earliest run wins ties and NaN never wins.
fn best_by_total_return(runs: &[StrategyRun]) -> Option<String> {
    let mut best: Option<&StrategyRun> = None;
    for run in runs {
        let value = run.result.metrics.total_return;
        if value.is_nan() {
            continue;
        }
        if best.is_none_or(|b| value > b.result.metrics.total_return) {
            best = Some(run);
        }
    }
    best.map(|run| run.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::signal::{Signal, SignalPoint, SignalSeries};
    use crate::domain::strategy::Strategy;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 3, 1).unwrap()
    }

    fn rising(n: usize) -> PriceSeries {
        let bars = (0..n)
            .map(|i| OhlcvBar::from_close(start() + chrono::Duration::days(i as i64), 100.0 + i as f64))
            .collect();
        PriceSeries::new("UP", bars).unwrap()
    }

    fn comparator() -> StrategyComparator {
        StrategyComparator::new(BacktestConfig::new(
            "UP",
            start(),
            start() + chrono::Duration::days(365),
        ))
    }

    struct Constant {
        name: &'static str,
        signal: Signal,
    }

    impl SignalGenerator for Constant {
        fn name(&self) -> &str {
            self.name
        }

        fn min_bars(&self) -> usize {
            1
        }

        fn generate(&self, series: &PriceSeries) -> Result<SignalSeries, QtraderError> {
            Ok(SignalSeries::new(
                series
                    .bars()
                    .iter()
                    .map(|bar| SignalPoint {
                        date: bar.date,
                        signal: self.signal,
                    })
                    .collect(),
            ))
        }
    }

    fn constant(name: &'static str, signal: Signal) -> StrategySpec {
        StrategySpec::new(Constant { name, signal })
    }

    #[test]
    fn failing_strategy_is_excluded() {
        let specs = vec![
            StrategySpec::new(Strategy::SmaCrossover { short: 5, long: 20 }),
            StrategySpec::new(Strategy::EmaCrossover { short: 30, long: 10 }),
        ];
        let result = comparator().compare(&rising(100), None, &specs).unwrap();
        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.excluded[0].kind, ErrorKind::Parameter);
        assert_eq!(result.best.as_deref(), Some("sma"));
    }

    #[test]
    fn best_is_highest_total_return() {
        let specs = vec![
            constant("flat", Signal::Flat),
            constant("long", Signal::Long),
            constant("short", Signal::Short),
        ];
        let result = comparator().compare(&rising(30), None, &specs).unwrap();
        assert_eq!(result.best.as_deref(), Some("long"));
        assert_eq!(
            result.runs.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["flat", "long", "short"]
        );
    }

    #[test]
    fn ties_go_to_the_first() {
        let specs = vec![constant("a", Signal::Flat), constant("b", Signal::Flat)];
        let result = comparator().compare(&rising(10), None, &specs).unwrap();
        assert_eq!(result.best.as_deref(), Some("a"));
    }

    #[test]
    fn duplicate_ids_are_excluded_after_the_first() {
        let specs = vec![
            constant("x", Signal::Flat),
            constant("x", Signal::Long),
        ];
        let result = comparator().compare(&rising(10), None, &specs).unwrap();
        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.get("x").unwrap().result.metrics.total_return, 0.0);
        assert_eq!(result.excluded[0].id, "x");
    }

    #[test]
    fn nan_total_return_never_wins() {
        let specs = vec![constant("only", Signal::Long)];
        let result = comparator().compare(&rising(1), None, &specs).unwrap();
        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.best, None);
    }

    #[test]
    fn all_failing_is_no_valid_strategies() {
        let specs = vec![StrategySpec::new(Strategy::SmaCrossover { short: 20, long: 50 })];
        let err = comparator().compare(&rising(10), None, &specs).unwrap_err();
        match err {
            QtraderError::NoValidStrategies { excluded } => {
                assert_eq!(excluded.len(), 1);
                assert_eq!(excluded[0].kind, ErrorKind::Data);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_is_empty_comparison() {
        let result = comparator().compare(&rising(10), None, &[]).unwrap();
        assert!(result.runs.is_empty());
        assert!(result.excluded.is_empty());
        assert_eq!(result.best, None);
    }

    #[test]
    fn compare_ids_excludes_unknown() {
        let ids = vec!["sma".to_string(), "bogus".to_string(), "macd".to_string()];
        let params = StrategyParams {
            short_window: 5,
            long_window: 20,
            ..StrategyParams::default()
        };
        let result = comparator()
            .compare_ids(&rising(120), None, &ids, &params)
            .unwrap();
        assert_eq!(result.runs.len(), 2);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.excluded[0].id, "bogus");
        assert!(result.best_run().is_some());
    }

    #[test]
    fn benchmark_alpha_is_attached_to_every_run() {
        let series = rising(40);
        let bench = EquityCurve::buy_and_hold(&series, 100_000.0).unwrap();
        let specs = vec![constant("flat", Signal::Flat), constant("long", Signal::Long)];
        let result = comparator().compare(&series, Some(&bench), &specs).unwrap();
        for run in &result.runs {
            assert!(run.result.metrics.alpha_vs_benchmark.is_some());
        }
    }
}

//! Custom strategies assembled from rule DSL expressions.
//!
//! Position state machine, starting Flat:
//! - Flat: `entry_long` goes Long, else `entry_short` goes Short
//! - Long: `exit_long` goes Flat
//! - Short: `exit_short` goes Flat
//!
//! Anything else holds the current state.

use crate::domain::error::QtraderError;
use crate::domain::evaluator::{ensure_min_bars, to_series};
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::price_series::PriceSeries;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::evaluate;
use crate::domain::rule_parser;
use crate::domain::signal::{Signal, SignalSeries};
use crate::domain::strategy::SignalGenerator;

/// Unparsed rule texts, as read from configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomRules {
    pub entry_long: Option<String>,
    pub exit_long: Option<String>,
    pub entry_short: Option<String>,
    pub exit_short: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuleStrategy {
    name: String,
    entry_long: Rule,
    exit_long: Rule,
    short_side: Option<(Rule, Rule)>,
    indicators: Vec<IndicatorType>,
}

impl RuleStrategy {
    pub fn from_rules(
        name: impl Into<String>,
        entry_long: Rule,
        exit_long: Rule,
        entry_short: Option<Rule>,
        exit_short: Option<Rule>,
    ) -> Result<Self, QtraderError> {
        let short_side = match (entry_short, exit_short) {
            (Some(entry), Some(exit)) => Some((entry, exit)),
            (None, None) => None,
            _ => {
                return Err(QtraderError::RuleInvalid {
                    reason: "entry_short and exit_short must be given together".to_string(),
                });
            }
        };

        let mut rules = vec![&entry_long, &exit_long];
        if let Some((entry, exit)) = &short_side {
            rules.push(entry);
            rules.push(exit);
        }

        let mut indicators: Vec<IndicatorType> = Vec::new();
        for t in rules.iter().flat_map(|r| r.indicators()) {
            if !t.has_valid_periods() {
                return Err(QtraderError::RuleInvalid {
                    reason: format!("{} has a zero period", t),
                });
            }
            if let IndicatorType::Macd { fast, slow, .. } = t {
                if fast >= slow {
                    return Err(QtraderError::RuleInvalid {
                        reason: format!("{}: fast period must be below slow period", t),
                    });
                }
            }
            if !indicators.contains(&t) {
                indicators.push(t);
            }
        }

        Ok(Self {
            name: name.into(),
            entry_long,
            exit_long,
            short_side,
            indicators,
        })
    }

    /// Parses rule texts. `entry_long` and `exit_long` are required.
    pub fn from_config(name: impl Into<String>, rules: &CustomRules) -> Result<Self, QtraderError> {
        let required = |text: &Option<String>, key: &str| -> Result<Rule, QtraderError> {
            match text.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => Ok(rule_parser::parse(t)?),
                _ => Err(QtraderError::RuleInvalid {
                    reason: format!("{} rule is required for a custom strategy", key),
                }),
            }
        };
        let optional = |text: &Option<String>| -> Result<Option<Rule>, QtraderError> {
            match text.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => Ok(Some(rule_parser::parse(t)?)),
                _ => Ok(None),
            }
        };

        Self::from_rules(
            name,
            required(&rules.entry_long, "entry_long")?,
            required(&rules.exit_long, "exit_long")?,
            optional(&rules.entry_short)?,
            optional(&rules.exit_short)?,
        )
    }

    pub fn indicators(&self) -> &[IndicatorType] {
        &self.indicators
    }

    pub fn allows_short(&self) -> bool {
        self.short_side.is_some()
    }
}

impl SignalGenerator for RuleStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.indicators
            .iter()
            .map(IndicatorType::lookback)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    fn generate(&self, series: &PriceSeries) -> Result<SignalSeries, QtraderError> {
        ensure_min_bars(series, self.min_bars())?;

        let bars = series.bars();
        let indicators = compute_indicators(bars, &self.indicators);
        let holds = |rule: &Rule, i: usize| evaluate(rule, bars, &indicators, i);

        let mut state = Signal::Flat;
        let signals = (0..bars.len())
            .map(|i| {
                state = match state {
                    Signal::Flat => {
                        if holds(&self.entry_long, i) {
                            Signal::Long
                        } else if self
                            .short_side
                            .as_ref()
                            .is_some_and(|(entry, _)| holds(entry, i))
                        {
                            Signal::Short
                        } else {
                            Signal::Flat
                        }
                    }
                    Signal::Long if holds(&self.exit_long, i) => Signal::Flat,
                    Signal::Short
                        if self
                            .short_side
                            .as_ref()
                            .is_some_and(|(_, exit)| holds(exit, i)) =>
                    {
                        Signal::Flat
                    }
                    held => held,
                };
                state
            })
            .collect();

        Ok(to_series(series, signals))
    }
}

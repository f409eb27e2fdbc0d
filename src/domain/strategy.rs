//! Built-in strategy variants and the signal generator plugin contract.

use std::fmt;
use std::sync::Arc;

use crate::domain::error::QtraderError;
use crate::domain::evaluator;
use crate::domain::indicator::{bollinger, macd, rsi};
use crate::domain::price_series::PriceSeries;
use crate::domain::rule_strategy::{CustomRules, RuleStrategy};
use crate::domain::signal::SignalSeries;

/// Anything that turns a price series into a tri-state signal series.
///
/// Implementations must be pure functions of the series: the comparator
/// calls `generate` concurrently on a shared `&PriceSeries`.
pub trait SignalGenerator: Send + Sync {
    /// Stable identifier used in reports and comparisons.
    fn name(&self) -> &str;

    /// Bars required before the first defined signal.
    fn min_bars(&self) -> usize;

    fn generate(&self, series: &PriceSeries) -> Result<SignalSeries, QtraderError>;
}

/// Parameter surface shared by every built-in variant. Each variant reads
/// only the fields it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub roc_period: usize,
    /// Percent, compared against ROC in percent.
    pub roc_threshold: f64,
    pub rules: CustomRules,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
            rsi_period: rsi::DEFAULT_PERIOD,
            rsi_lower: 30.0,
            rsi_upper: 70.0,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            bollinger_period: bollinger::DEFAULT_PERIOD,
            bollinger_k: bollinger::DEFAULT_MULTIPLIER,
            roc_period: 10,
            roc_threshold: 1.0,
            rules: CustomRules::default(),
        }
    }
}

pub const RSI_SMA_ENTRY_BELOW: f64 = 40.0;
pub const RSI_SMA_EXIT_ABOVE: f64 = 70.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Long when short SMA > long SMA, else Short.
    SmaCrossover { short: usize, long: usize },
    /// Long when short EMA > long EMA, else Flat.
    EmaCrossover { short: usize, long: usize },
    /// Long / Short / Flat on the sign of short SMA - long SMA.
    DualSma { short: usize, long: usize },
    /// Long above the signal line, Short below.
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// Mean reversion: Long below the lower band, Short above the upper.
    Bollinger { period: usize, k: f64 },
    /// Long when ROC > +threshold, Short when ROC < -threshold.
    Momentum { period: usize, threshold: f64 },
    /// Long when RSI < lower, Short when RSI > upper.
    RsiThreshold {
        period: usize,
        lower: f64,
        upper: f64,
    },
    /// Stateful: enter Long on oversold RSI above the short SMA, exit to
    /// Flat on overbought RSI below it, hold otherwise.
    RsiSma {
        rsi_period: usize,
        short: usize,
        entry_below: f64,
        exit_above: f64,
    },
}

impl Strategy {
    pub const BUILTIN_IDS: [&'static str; 8] = [
        "sma",
        "ema",
        "dual_sma",
        "macd",
        "bollinger",
        "momentum",
        "rsi",
        "rsi_sma",
    ];

    /// Resolves a built-in strategy id against the parameter surface.
    pub fn from_id(id: &str, params: &StrategyParams) -> Result<Strategy, QtraderError> {
        let p = params;
        let strategy = match id {
            "sma" => Strategy::SmaCrossover {
                short: p.short_window,
                long: p.long_window,
            },
            "ema" => Strategy::EmaCrossover {
                short: p.short_window,
                long: p.long_window,
            },
            "dual_sma" => Strategy::DualSma {
                short: p.short_window,
                long: p.long_window,
            },
            "macd" => Strategy::Macd {
                fast: p.macd_fast,
                slow: p.macd_slow,
                signal: p.macd_signal,
            },
            "bollinger" => Strategy::Bollinger {
                period: p.bollinger_period,
                k: p.bollinger_k,
            },
            "momentum" => Strategy::Momentum {
                period: p.roc_period,
                threshold: p.roc_threshold,
            },
            "rsi" => Strategy::RsiThreshold {
                period: p.rsi_period,
                lower: p.rsi_lower,
                upper: p.rsi_upper,
            },
            "rsi_sma" => Strategy::RsiSma {
                rsi_period: p.rsi_period,
                short: p.short_window,
                entry_below: RSI_SMA_ENTRY_BELOW,
                exit_above: RSI_SMA_EXIT_ABOVE,
            },
            other => {
                return Err(QtraderError::UnknownStrategy {
                    id: other.to_string(),
                });
            }
        };
        Ok(strategy)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Strategy::SmaCrossover { .. } => "sma",
            Strategy::EmaCrossover { .. } => "ema",
            Strategy::DualSma { .. } => "dual_sma",
            Strategy::Macd { .. } => "macd",
            Strategy::Bollinger { .. } => "bollinger",
            Strategy::Momentum { .. } => "momentum",
            Strategy::RsiThreshold { .. } => "rsi",
            Strategy::RsiSma { .. } => "rsi_sma",
        }
    }

    pub fn validate(&self) -> Result<(), QtraderError> {
        match *self {
            Strategy::SmaCrossover { short, long }
            | Strategy::EmaCrossover { short, long }
            | Strategy::DualSma { short, long } => {
                positive("short_window", short)?;
                positive("long_window", long)?;
                if short >= long {
                    return Err(QtraderError::parameter(
                        "short_window",
                        format!("must be less than long_window ({} >= {})", short, long),
                    ));
                }
            }
            Strategy::Macd { fast, slow, signal } => {
                positive("macd_fast", fast)?;
                positive("macd_slow", slow)?;
                positive("macd_signal", signal)?;
                if fast >= slow {
                    return Err(QtraderError::parameter(
                        "macd_fast",
                        format!("must be less than macd_slow ({} >= {})", fast, slow),
                    ));
                }
            }
            Strategy::Bollinger { period, k } => {
                positive("bollinger_period", period)?;
                if !k.is_finite() || k <= 0.0 {
                    return Err(QtraderError::parameter(
                        "bollinger_k",
                        format!("must be a positive number, got {}", k),
                    ));
                }
            }
            Strategy::Momentum { period, threshold } => {
                positive("roc_period", period)?;
                if !threshold.is_finite() || threshold < 0.0 {
                    return Err(QtraderError::parameter(
                        "roc_threshold",
                        format!("must be a non-negative number, got {}", threshold),
                    ));
                }
            }
            Strategy::RsiThreshold {
                period,
                lower,
                upper,
            } => {
                positive("rsi_period", period)?;
                rsi_bounds(lower, upper)?;
            }
            Strategy::RsiSma {
                rsi_period,
                short,
                entry_below,
                exit_above,
            } => {
                positive("rsi_period", rsi_period)?;
                positive("short_window", short)?;
                rsi_bounds(entry_below, exit_above)?;
            }
        }
        Ok(())
    }

    /// Bars needed before the variant's indicators are all defined.
    pub fn min_bars(&self) -> usize {
        match *self {
            Strategy::SmaCrossover { long, .. }
            | Strategy::EmaCrossover { long, .. }
            | Strategy::DualSma { long, .. } => long,
            Strategy::Macd { fast, slow, signal } => (fast.max(slow) + signal).saturating_sub(1),
            Strategy::Bollinger { period, .. } => period,
            Strategy::Momentum { period, .. } | Strategy::RsiThreshold { period, .. } => period + 1,
            Strategy::RsiSma {
                rsi_period, short, ..
            } => (rsi_period + 1).max(short),
        }
    }
}

fn positive(name: &str, value: usize) -> Result<(), QtraderError> {
    if value == 0 {
        return Err(QtraderError::parameter(name, "must be positive"));
    }
    Ok(())
}

fn rsi_bounds(lower: f64, upper: f64) -> Result<(), QtraderError> {
    let in_range = |v: f64| (0.0..=100.0).contains(&v);
    if !in_range(lower) || !in_range(upper) {
        return Err(QtraderError::parameter(
            "rsi_lower",
            format!("RSI bounds must lie in [0, 100], got {} and {}", lower, upper),
        ));
    }
    if lower >= upper {
        return Err(QtraderError::parameter(
            "rsi_lower",
            format!("must be less than rsi_upper ({} >= {})", lower, upper),
        ));
    }
    Ok(())
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::SmaCrossover { short, long } => write!(f, "SMA crossover ({}/{})", short, long),
            Strategy::EmaCrossover { short, long } => write!(f, "EMA crossover ({}/{})", short, long),
            Strategy::DualSma { short, long } => write!(f, "Dual SMA ({}/{})", short, long),
            Strategy::Macd { fast, slow, signal } => {
                write!(f, "MACD ({},{},{})", fast, slow, signal)
            }
            Strategy::Bollinger { period, k } => write!(f, "Bollinger ({}, {}σ)", period, k),
            Strategy::Momentum { period, threshold } => {
                write!(f, "Momentum ROC({}) ±{}%", period, threshold)
            }
            Strategy::RsiThreshold {
                period,
                lower,
                upper,
            } => write!(f, "RSI({}) {}/{}", period, lower, upper),
            Strategy::RsiSma {
                rsi_period, short, ..
            } => write!(f, "RSI({}) + SMA({})", rsi_period, short),
        }
    }
}

impl SignalGenerator for Strategy {
    fn name(&self) -> &str {
        self.id()
    }

    fn min_bars(&self) -> usize {
        Strategy::min_bars(self)
    }

    fn generate(&self, series: &PriceSeries) -> Result<SignalSeries, QtraderError> {
        evaluator::evaluate(series, self)
    }
}

/// A strategy to run in a comparison, under the id it is reported as.
#[derive(Clone)]
pub struct StrategySpec {
    pub id: String,
    pub generator: Arc<dyn SignalGenerator>,
}

impl StrategySpec {
    pub fn new(generator: impl SignalGenerator + 'static) -> Self {
        Self {
            id: generator.name().to_string(),
            generator: Arc::new(generator),
        }
    }
}

impl fmt::Debug for StrategySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategySpec").field("id", &self.id).finish()
    }
}

/// Id accepted by [`resolve`] for a rule-based strategy built from
/// [`StrategyParams::rules`].
pub const CUSTOM_ID: &str = "custom";

/// Resolves any strategy id, built-in or `custom`, into a runnable spec.
/// The result is validated, so a returned spec only fails on the data.
pub fn resolve(id: &str, params: &StrategyParams) -> Result<StrategySpec, QtraderError> {
    if id == CUSTOM_ID {
        return Ok(StrategySpec::new(RuleStrategy::from_config(
            CUSTOM_ID,
            &params.rules,
        )?));
    }
    let strategy = Strategy::from_id(id, params)?;
    strategy.validate()?;
    Ok(StrategySpec::new(strategy))
}

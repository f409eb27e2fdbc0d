//! Rule AST for custom strategies.
//!
//! - `Operand`: what can be compared (price fields, constants, indicators)
//! - `IndicatorRef`: an indicator plus the field of a multi-value output
//! - `Rule`: comparison, composite and temporal rules

use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    Constant(f64),
    Indicator(IndicatorRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove { left: Operand, right: Operand },
    CrossBelow { left: Operand, right: Operand },
    Above { left: Operand, right: Operand },
    Below { left: Operand, right: Operand },
    Between { operand: Operand, lower: f64, upper: f64 },
    Equals { left: Operand, right: Operand },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    Consecutive { rule: Box<Rule>, count: usize },
    AnyOf { rule: Box<Rule>, count: usize },
}

impl Operand {
    fn indicator_type(&self) -> Option<&IndicatorType> {
        match self {
            Operand::Indicator(r) => Some(&r.indicator_type),
            _ => None,
        }
    }
}

impl Rule {
    /// Every indicator referenced anywhere in the rule, without duplicates.
    pub fn indicators(&self) -> Vec<IndicatorType> {
        let mut out = Vec::new();
        self.collect_indicators(&mut out);
        out
    }

    fn collect_indicators(&self, out: &mut Vec<IndicatorType>) {
        fn push(out: &mut Vec<IndicatorType>, operand: &Operand) {
            if let Some(t) = operand.indicator_type() {
                if !out.contains(t) {
                    out.push(t.clone());
                }
            }
        }
        match self {
            Rule::CrossAbove { left, right }
            | Rule::CrossBelow { left, right }
            | Rule::Above { left, right }
            | Rule::Below { left, right }
            | Rule::Equals { left, right } => {
                push(out, left);
                push(out, right);
            }
            Rule::Between { operand, .. } => push(out, operand),
            Rule::And(rules) | Rule::Or(rules) => {
                for r in rules {
                    r.collect_indicators(out);
                }
            }
            Rule::Not(rule) | Rule::Consecutive { rule, .. } | Rule::AnyOf { rule, .. } => {
                rule.collect_indicators(out)
            }
        }
    }

    /// Largest warm-up among the referenced indicators (1 when none).
    pub fn lookback(&self) -> usize {
        self.indicators()
            .iter()
            .map(IndicatorType::lookback)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Smallest temporal count, if any `CONSECUTIVE`/`ANY_OF` is present.
    pub(crate) fn min_temporal_count(&self) -> Option<usize> {
        match self {
            Rule::Consecutive { rule, count } | Rule::AnyOf { rule, count } => {
                Some(rule.min_temporal_count().map_or(*count, |c| c.min(*count)))
            }
            Rule::Not(rule) => rule.min_temporal_count(),
            Rule::And(rules) | Rule::Or(rules) => {
                rules.iter().filter_map(Rule::min_temporal_count).min()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sma(n: usize) -> Operand {
        Operand::Indicator(IndicatorRef {
            indicator_type: IndicatorType::Sma(n),
            field: IndicatorField::Value,
        })
    }

    #[test]
    fn indicators_are_collected_from_nested_rules() {
        let rule = Rule::And(vec![
            Rule::CrossAbove {
                left: sma(20),
                right: sma(50),
            },
            Rule::Not(Box::new(Rule::Below {
                left: Operand::Close,
                right: sma(20),
            })),
            Rule::Consecutive {
                rule: Box::new(Rule::Between {
                    operand: Operand::Indicator(IndicatorRef {
                        indicator_type: IndicatorType::Rsi(14),
                        field: IndicatorField::Value,
                    }),
                    lower: 30.0,
                    upper: 70.0,
                }),
                count: 3,
            },
        ]);
        assert_eq!(
            rule.indicators(),
            vec![
                IndicatorType::Sma(20),
                IndicatorType::Sma(50),
                IndicatorType::Rsi(14)
            ]
        );
    }

    #[test]
    fn lookback_is_max_of_indicators() {
        let rule = Rule::Or(vec![
            Rule::Above {
                left: sma(10),
                right: Operand::Constant(1.0),
            },
            Rule::Above {
                left: Operand::Indicator(IndicatorRef {
                    indicator_type: IndicatorType::Macd {
                        fast: 12,
                        slow: 26,
                        signal: 9,
                    },
                    field: IndicatorField::MacdHistogram,
                }),
                right: Operand::Constant(0.0),
            },
        ]);
        assert_eq!(rule.lookback(), 34);
    }

    #[test]
    fn lookback_without_indicators_is_one() {
        let rule = Rule::Above {
            left: Operand::Close,
            right: Operand::Open,
        };
        assert!(rule.indicators().is_empty());
        assert_eq!(rule.lookback(), 1);
    }

    #[test]
    fn min_temporal_count_finds_nested_counts() {
        let rule = Rule::And(vec![
            Rule::AnyOf {
                rule: Box::new(Rule::Above {
                    left: Operand::Close,
                    right: Operand::Constant(1.0),
                }),
                count: 5,
            },
            Rule::Not(Box::new(Rule::Consecutive {
                rule: Box::new(Rule::Above {
                    left: Operand::Close,
                    right: Operand::Constant(1.0),
                }),
                count: 2,
            })),
        ]);
        assert_eq!(rule.min_temporal_count(), Some(2));

        let plain = Rule::Above {
            left: Operand::Close,
            right: Operand::Constant(1.0),
        };
        assert_eq!(plain.min_temporal_count(), None);
    }
}

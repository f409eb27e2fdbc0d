//! Core domain types and logic. Pure computation: nothing here performs I/O.

pub mod backtest;
pub mod comparator;
pub mod config_validation;
pub mod equity;
pub mod error;
pub mod evaluator;
pub mod indicator;
pub mod indicator_helpers;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod price_series;
pub mod returns;
pub mod rule;
pub mod rule_eval;
pub mod rule_parser;
pub mod rule_strategy;
pub mod signal;
pub mod strategy;
pub mod trade_log;

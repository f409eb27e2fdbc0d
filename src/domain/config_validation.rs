//! Configuration loading and validation.
//!
//! Every value is checked before a run starts, so a bad config fails with a
//! `ConfigMissing`/`ConfigInvalid` naming the offending key.

use std::path::PathBuf;

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CAPITAL};
use crate::domain::error::QtraderError;
use crate::domain::rule_strategy::CustomRules;
use crate::domain::strategy::{self, Strategy, StrategyParams};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_DATA_PATH: &str = "data";
pub const DEFAULT_STRATEGY_ID: &str = "sma";

/// Reads `[backtest]`. `symbol_override` takes precedence over the
/// configured symbol.
pub fn load_backtest_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<BacktestConfig, QtraderError> {
    let symbol = match symbol_override {
        Some(s) => s.to_string(),
        None => non_empty(config, "backtest", "symbol").ok_or_else(|| missing("backtest", "symbol"))?,
    };

    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let initial_capital =
        read_f64(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let risk_free_rate = read_f64(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    Ok(BacktestConfig {
        symbol,
        start_date,
        end_date,
        initial_capital,
        risk_free_rate,
        benchmark: non_empty(config, "backtest", "benchmark"),
    })
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), QtraderError> {
    load_backtest_config(config, None).map(|_| ())
}

/// Reads the `[strategy]` parameter surface, falling back to the defaults
/// of [`StrategyParams`] for absent keys.
pub fn load_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, QtraderError> {
    let d = StrategyParams::default();
    let s = "strategy";
    Ok(StrategyParams {
        short_window: read_usize(config, s, "short_window", d.short_window)?,
        long_window: read_usize(config, s, "long_window", d.long_window)?,
        rsi_period: read_usize(config, s, "rsi_period", d.rsi_period)?,
        rsi_lower: read_f64(config, s, "rsi_lower", d.rsi_lower)?,
        rsi_upper: read_f64(config, s, "rsi_upper", d.rsi_upper)?,
        macd_fast: read_usize(config, s, "macd_fast", d.macd_fast)?,
        macd_slow: read_usize(config, s, "macd_slow", d.macd_slow)?,
        macd_signal: read_usize(config, s, "macd_signal", d.macd_signal)?,
        bollinger_period: read_usize(config, s, "bollinger_period", d.bollinger_period)?,
        bollinger_k: read_f64(config, s, "bollinger_k", d.bollinger_k)?,
        roc_period: read_usize(config, s, "roc_period", d.roc_period)?,
        roc_threshold: read_f64(config, s, "roc_threshold", d.roc_threshold)?,
        rules: CustomRules {
            entry_long: non_empty(config, s, "entry_long"),
            exit_long: non_empty(config, s, "exit_long"),
            entry_short: non_empty(config, s, "entry_short"),
            exit_short: non_empty(config, s, "exit_short"),
        },
    })
}

pub fn strategy_id(config: &dyn ConfigPort) -> String {
    non_empty(config, "strategy", "id").unwrap_or_else(|| DEFAULT_STRATEGY_ID.to_string())
}

/// Checks that the configured strategy resolves, including parsing custom
/// rules. Parameter problems are reported against `[strategy]`.
pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), QtraderError> {
    let params = load_strategy_params(config)?;
    let id = strategy_id(config);
    strategy::resolve(&id, &params).map(|_| ())
}

/// `[compare] strategies`, comma separated; every built-in when absent.
pub fn compare_ids(config: &dyn ConfigPort) -> Vec<String> {
    match non_empty(config, "compare", "strategies") {
        Some(list) => split_ids(&list),
        None => Strategy::BUILTIN_IDS.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn data_path(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(non_empty(config, "data", "path").unwrap_or_else(|| DEFAULT_DATA_PATH.into()))
}

pub fn report_pretty(config: &dyn ConfigPort) -> bool {
    config.get_bool("report", "pretty", true)
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, QtraderError> {
    if config.get_string(section, key).is_none() {
        return Ok(default);
    }
    let value = config.get_double(section, key, f64::NAN);
    if value.is_nan() {
        return Err(invalid(section, key, "expected a number"));
    }
    Ok(value)
}

fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, QtraderError> {
    if config.get_string(section, key).is_none() {
        return Ok(default);
    }
    let value = config.get_int(section, key, i64::MIN);
    if value == i64::MIN {
        return Err(invalid(section, key, "expected an integer"));
    }
    usize::try_from(value).map_err(|_| invalid(section, key, "must not be negative"))
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, QtraderError> {
    let value = non_empty(config, "backtest", field).ok_or_else(|| missing("backtest", field))?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        invalid(
            "backtest",
            field,
            &format!("invalid {} format, expected YYYY-MM-DD", field),
        )
    })
}

fn missing(section: &str, key: &str) -> QtraderError {
    QtraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> QtraderError {
    QtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const BACKTEST: &str = "[backtest]\nsymbol = SPY\nstart_date = 2020-01-01\nend_date = 2024-12-31\n";

    #[test]
    fn valid_backtest_config_loads() {
        let config = make_config(
            r#"
[backtest]
symbol = SPY
start_date = 2020-01-01
end_date = 2024-12-31
initial_capital = 50000
risk_free_rate = 0.02
benchmark = QQQ
"#,
        );
        let c = load_backtest_config(&config, None).unwrap();
        assert_eq!(c.symbol, "SPY");
        assert_eq!(c.start_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(c.initial_capital, 50000.0);
        assert_eq!(c.risk_free_rate, 0.02);
        assert_eq!(c.benchmark.as_deref(), Some("QQQ"));
    }

    #[test]
    fn defaults_apply() {
        let c = load_backtest_config(&make_config(BACKTEST), None).unwrap();
        assert_eq!(c.initial_capital, DEFAULT_INITIAL_CAPITAL);
        assert_eq!(c.risk_free_rate, 0.0);
        assert_eq!(c.benchmark, None);
    }

    #[test]
    fn symbol_override_wins() {
        let c = load_backtest_config(&make_config(BACKTEST), Some("AAPL")).unwrap();
        assert_eq!(c.symbol, "AAPL");
    }

    #[test]
    fn missing_symbol_fails() {
        let config = make_config("[backtest]\nstart_date = 2020-01-01\nend_date = 2024-12-31\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, QtraderError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn initial_capital_must_be_positive() {
        for capital in ["0", "-100"] {
            let config = make_config(&format!("{}initial_capital = {}\n", BACKTEST, capital));
            let err = validate_backtest_config(&config).unwrap_err();
            assert!(
                matches!(err, QtraderError::ConfigInvalid { key, .. } if key == "initial_capital")
            );
        }
    }

    #[test]
    fn non_numeric_capital_fails() {
        let config = make_config(&format!("{}initial_capital = lots\n", BACKTEST));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, QtraderError::ConfigInvalid { reason, .. } if reason.contains("number")));
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        for rate in ["1.5", "-0.05", "1"] {
            let config = make_config(&format!("{}risk_free_rate = {}\n", BACKTEST, rate));
            let err = validate_backtest_config(&config).unwrap_err();
            assert!(
                matches!(err, QtraderError::ConfigInvalid { key, .. } if key == "risk_free_rate")
            );
        }
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = make_config("[backtest]\nsymbol = SPY\nstart_date = 2020/01/01\nend_date = 2024-12-31\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, QtraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[backtest]\nsymbol = SPY\nstart_date = 2020-01-01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, QtraderError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config = make_config("[backtest]\nsymbol = SPY\nstart_date = 2024-12-31\nend_date = 2020-01-01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, QtraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn strategy_params_read_with_defaults() {
        let config = make_config(
            "[strategy]\nshort_window = 5\nlong_window = 30\nbollinger_k = 2.5\nentry_long = ABOVE(close, SMA(5))\n",
        );
        let p = load_strategy_params(&config).unwrap();
        assert_eq!(p.short_window, 5);
        assert_eq!(p.long_window, 30);
        assert_eq!(p.bollinger_k, 2.5);
        assert_eq!(p.rsi_period, StrategyParams::default().rsi_period);
        assert_eq!(p.rules.entry_long.as_deref(), Some("ABOVE(close, SMA(5))"));
        assert_eq!(p.rules.exit_long, None);
    }

    #[test]
    fn negative_window_fails() {
        let config = make_config("[strategy]\nshort_window = -5\n");
        let err = load_strategy_params(&config).unwrap_err();
        assert!(matches!(err, QtraderError::ConfigInvalid { key, .. } if key == "short_window"));
    }

    #[test]
    fn non_integer_window_fails() {
        let config = make_config("[strategy]\nlong_window = 2.5\n");
        let err = load_strategy_params(&config).unwrap_err();
        assert!(matches!(err, QtraderError::ConfigInvalid { key, .. } if key == "long_window"));
    }

    #[test]
    fn default_strategy_validates() {
        assert!(validate_strategy_config(&make_config("[strategy]\n")).is_ok());
        assert_eq!(strategy_id(&make_config("")), "sma");
    }

    #[test]
    fn unknown_strategy_id_fails() {
        let err = validate_strategy_config(&make_config("[strategy]\nid = wobble\n")).unwrap_err();
        assert!(matches!(err, QtraderError::UnknownStrategy { .. }));
    }

    #[test]
    fn inverted_windows_fail_validation() {
        let config = make_config("[strategy]\nid = ema\nshort_window = 60\nlong_window = 20\n");
        assert!(matches!(
            validate_strategy_config(&config),
            Err(QtraderError::Parameter { .. })
        ));
    }

    #[test]
    fn custom_strategy_requires_rules() {
        let config = make_config("[strategy]\nid = custom\nentry_long = ABOVE(close, SMA(20))\n");
        assert!(matches!(
            validate_strategy_config(&config),
            Err(QtraderError::RuleInvalid { .. })
        ));

        let config = make_config(
            "[strategy]\nid = custom\nentry_long = CROSS_ABOVE(SMA(20), SMA(50))\nexit_long = CROSS_BELOW(SMA(20), SMA(50))\n",
        );
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn custom_rule_syntax_errors_surface() {
        let config = make_config("[strategy]\nid = custom\nentry_long = ABOVE(close,\nexit_long = BELOW(close, 1)\n");
        assert!(matches!(
            validate_strategy_config(&config),
            Err(QtraderError::RuleParse(_))
        ));
    }

    #[test]
    fn compare_ids_split_and_default() {
        let config = make_config("[compare]\nstrategies = sma, macd,,rsi \n");
        assert_eq!(compare_ids(&config), vec!["sma", "macd", "rsi"]);
        assert_eq!(compare_ids(&make_config("")).len(), Strategy::BUILTIN_IDS.len());
    }

    #[test]
    fn data_path_and_report_defaults() {
        let empty = make_config("");
        assert_eq!(data_path(&empty), PathBuf::from("data"));
        assert!(report_pretty(&empty));
        let config = make_config("[data]\npath = /srv/prices\n[report]\npretty = no\n");
        assert_eq!(data_path(&config), PathBuf::from("/srv/prices"));
        assert!(!report_pretty(&config));
    }
}

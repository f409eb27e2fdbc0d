//! CLI definition and dispatch.
//!
//! Reports go to stdout (or `--output`); progress and errors are logged to
//! stderr through `tracing`.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::{CsvAdapter, read_equity_curve};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::comparator::{Comparison, StrategyComparator};
use crate::domain::config_validation::{
    self, load_backtest_config, load_strategy_params, validate_backtest_config,
    validate_strategy_config,
};
use crate::domain::equity::EquityCurve;
use crate::domain::error::QtraderError;
use crate::domain::metrics::Metrics;
use crate::domain::price_series::PriceSeries;
use crate::domain::rule_parser;
use crate::domain::rule_strategy::RuleStrategy;
use crate::domain::strategy::{self, CUSTOM_ID, Strategy, StrategyParams};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "qtrader", about = "Trading strategy backtester and comparator")]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest a single strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Strategy id, overriding [strategy] id
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Validate and print the plan without loading data
        #[arg(long)]
        dry_run: bool,
    },
    /// Run several strategies over one symbol and rank them
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Comma-separated strategy ids, overriding [compare] strategies
        #[arg(long)]
        strategies: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute metrics for a date,equity CSV
    Evaluate {
        #[arg(long)]
        equity: PathBuf,
        /// date,equity CSV to compute alpha against
        #[arg(long)]
        benchmark: Option<PathBuf>,
        #[arg(long, default_value_t = 0.0)]
        risk_free_rate: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List strategy ids
    ListStrategies,
    /// List symbols in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            strategy,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref(), strategy.as_deref())
            } else {
                backtest_command(
                    &config,
                    symbol.as_deref(),
                    strategy.as_deref(),
                    output.as_deref(),
                )
            }
        }
        Command::Compare {
            config,
            symbol,
            strategies,
            output,
        } => compare_command(
            &config,
            symbol.as_deref(),
            strategies.as_deref(),
            output.as_deref(),
        ),
        Command::Evaluate {
            equity,
            benchmark,
            risk_free_rate,
            output,
        } => evaluate_command(
            &equity,
            benchmark.as_deref(),
            risk_free_rate,
            output.as_deref(),
        ),
        Command::Validate { config } => validate_command(&config),
        Command::ListStrategies => list_strategies(),
        Command::ListSymbols { config } => list_symbols_command(&config),
        Command::Info { config, symbol } => info_command(&config, symbol.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QtraderError> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Fetches the configured symbol and, when a benchmark symbol is set, its
/// buy-and-hold curve over the same range.
pub fn load_series(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
) -> Result<(PriceSeries, Option<EquityCurve>), QtraderError> {
    let series = data_port.fetch_prices(&config.symbol, config.start_date, config.end_date)?;
    info!(
        symbol = series.symbol(),
        bars = series.len(),
        "{} to {}",
        series.first_date(),
        series.last_date()
    );

    let benchmark = match &config.benchmark {
        Some(symbol) => {
            let bench = data_port.fetch_prices(symbol, config.start_date, config.end_date)?;
            Some(EquityCurve::buy_and_hold(&bench, config.initial_capital)?)
        }
        None => None,
    };
    Ok((series, benchmark))
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy_id: &str,
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<BacktestResult, QtraderError> {
    let spec = strategy::resolve(strategy_id, params)?;
    let (series, benchmark) = load_series(data_port, config)?;
    run_backtest(&series, spec.generator.as_ref(), config, benchmark.as_ref())
}

pub fn run_compare_pipeline(
    data_port: &dyn DataPort,
    ids: &[String],
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<Comparison, QtraderError> {
    let (series, benchmark) = load_series(data_port, config)?;
    StrategyComparator::new(config.clone()).compare_ids(&series, benchmark.as_ref(), ids, params)
}

/// Runs `write` against `path`, or stdout when no path is given.
fn write_output(
    path: Option<&Path>,
    write: impl FnOnce(&mut dyn Write) -> Result<(), QtraderError>,
) -> Result<(), QtraderError> {
    match path {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write(&mut out)?;
            out.flush()?;
            info!("report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write(&mut out)?;
        }
    }
    Ok(())
}

fn reporter(config: &dyn ConfigPort) -> JsonReportAdapter {
    JsonReportAdapter::new(config_validation::report_pretty(config))
}

fn backtest_command(
    config_path: &Path,
    symbol: Option<&str>,
    strategy_override: Option<&str>,
    output: Option<&Path>,
) -> Result<(), QtraderError> {
    // Stage 1: config
    let config = load_config(config_path)?;
    let bt_config = load_backtest_config(&config, symbol)?;
    let params = load_strategy_params(&config)?;
    let strategy_id = strategy_override
        .map(str::to_string)
        .unwrap_or_else(|| config_validation::strategy_id(&config));

    // Stage 2: data and pipeline
    let data_port = CsvAdapter::new(config_validation::data_path(&config));
    let result = run_backtest_pipeline(&data_port, &strategy_id, &params, &bt_config)?;

    // Stage 3: report
    write_output(output, |out| reporter(&config).write_backtest(&result, out))
}

fn compare_command(
    config_path: &Path,
    symbol: Option<&str>,
    strategies: Option<&str>,
    output: Option<&Path>,
) -> Result<(), QtraderError> {
    let config = load_config(config_path)?;
    let bt_config = load_backtest_config(&config, symbol)?;
    let params = load_strategy_params(&config)?;
    let ids = match strategies {
        Some(list) => config_validation::split_ids(list),
        None => config_validation::compare_ids(&config),
    };
    info!("comparing {} strategies on {}", ids.len(), bt_config.symbol);

    let data_port = CsvAdapter::new(config_validation::data_path(&config));
    let report = reporter(&config);
    match run_compare_pipeline(&data_port, &ids, &params, &bt_config) {
        Ok(comparison) => write_output(output, |out| report.write_comparison(&comparison, out)),
        Err(QtraderError::NoValidStrategies { excluded }) => {
            write_output(output, |out| report.write_comparison_failure(&excluded, out))?;
            Err(QtraderError::NoValidStrategies { excluded })
        }
        Err(e) => Err(e),
    }
}

fn evaluate_command(
    equity_path: &Path,
    benchmark_path: Option<&Path>,
    risk_free_rate: f64,
    output: Option<&Path>,
) -> Result<(), QtraderError> {
    let curve = read_equity_curve(equity_path)?;
    let mut metrics = Metrics::compute(&curve, risk_free_rate)?;
    if let Some(path) = benchmark_path {
        let benchmark = read_equity_curve(path)?;
        metrics = metrics.with_benchmark(&curve, &benchmark)?;
    }
    write_output(output, |out| JsonReportAdapter::default().write_metrics(&metrics, out))
}

pub fn run_dry_run(
    config_path: &Path,
    symbol: Option<&str>,
    strategy_override: Option<&str>,
) -> Result<(), QtraderError> {
    let config = load_config(config_path)?;
    let bt_config = load_backtest_config(&config, symbol)?;
    let params = load_strategy_params(&config)?;
    let strategy_id = strategy_override
        .map(str::to_string)
        .unwrap_or_else(|| config_validation::strategy_id(&config));
    let spec = strategy::resolve(&strategy_id, &params)?;

    println!("symbol:          {}", bt_config.symbol);
    println!(
        "range:           {} to {}",
        bt_config.start_date, bt_config.end_date
    );
    println!("initial capital: {}", bt_config.initial_capital);
    println!("risk-free rate:  {}", bt_config.risk_free_rate);
    if let Some(benchmark) = &bt_config.benchmark {
        println!("benchmark:       {}", benchmark);
    }
    println!("strategy:        {}", describe(&strategy_id, &params));
    println!("minimum bars:    {}", spec.generator.min_bars());
    if strategy_id == CUSTOM_ID {
        let rules = RuleStrategy::from_config(CUSTOM_ID, &params.rules)?;
        let indicators: Vec<String> = rules.indicators().iter().map(|i| i.to_string()).collect();
        println!("indicators:      {}", indicators.join(", "));
        println!("short side:      {}", if rules.allows_short() { "yes" } else { "no" });
    }
    info!("dry run complete: configuration is valid");
    Ok(())
}

fn describe(id: &str, params: &StrategyParams) -> String {
    match Strategy::from_id(id, params) {
        Ok(strategy) => strategy.to_string(),
        Err(_) => id.to_string(),
    }
}

fn validate_command(config_path: &Path) -> Result<(), QtraderError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    check_rule_syntax(&config)?;
    validate_strategy_config(&config)?;

    if config.get_string("compare", "strategies").is_some() {
        let params = load_strategy_params(&config)?;
        for id in config_validation::compare_ids(&config) {
            strategy::resolve(&id, &params)?;
        }
    }

    println!("configuration is valid");
    Ok(())
}

/// Parses each configured rule, logging a caret under the first syntax error.
fn check_rule_syntax(config: &dyn ConfigPort) -> Result<(), QtraderError> {
    for key in ["entry_long", "exit_long", "entry_short", "exit_short"] {
        let Some(text) = config.get_string("strategy", key) else {
            continue;
        };
        if let Err(e) = rule_parser::parse(&text) {
            error!("{} rule:\n{}", key, e.display_with_context(&text));
            return Err(e.into());
        }
    }
    Ok(())
}

fn list_strategies() -> Result<(), QtraderError> {
    let params = StrategyParams::default();
    for id in Strategy::BUILTIN_IDS {
        println!("{:<10} {}", id, describe(id, &params));
    }
    println!("{:<10} rules from [strategy] entry/exit keys", CUSTOM_ID);
    Ok(())
}

fn list_symbols_command(config_path: &Path) -> Result<(), QtraderError> {
    let config = load_config(config_path)?;
    let data_port = CsvAdapter::new(config_validation::data_path(&config));
    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        info!("no symbols found");
    }
    for symbol in &symbols {
        println!("{}", symbol);
    }
    Ok(())
}

fn info_command(config_path: &Path, symbol: Option<&str>) -> Result<(), QtraderError> {
    let config = load_config(config_path)?;
    let data_port = CsvAdapter::new(config_validation::data_path(&config));
    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => data_port.list_symbols()?,
    };

    for s in &symbols {
        match data_port.get_data_range(s)? {
            Some((first, last, count)) => println!("{}: {} bars, {} to {}", s, count, first, last),
            None => println!("{}: no data", s),
        }
    }
    Ok(())
}

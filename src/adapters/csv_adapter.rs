//! CSV file data adapter.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with a header row. Columns are
//! located by name (case-insensitive): `date` and `close` are required,
//! `open`, `high`, `low` and `volume` are read when present. Anything else,
//! including `adj close`, is ignored.

use crate::domain::equity::{EquityCurve, EquityPoint};
use crate::domain::error::QtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Every usable bar in the symbol's file, sorted by date.
    fn read_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, QtraderError> {
        let path = self.csv_path(symbol);
        let mut rdr = open_reader(&path)?;
        let headers = rdr.headers().map_err(|e| csv_error(&path, e))?.clone();
        let columns = Columns::locate(&headers, &path)?;

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(&path, e))?;
            // header is line 1
            let line = line + 2;
            match columns.parse_bar(&record) {
                Ok(bar) => bars.push(bar),
                Err(reason) => warn!(file = %path.display(), line, reason, "skipping row"),
            }
        }

        bars.sort_by_key(|b| b.date);
        let before = bars.len();
        bars.dedup_by_key(|b| b.date);
        if bars.len() < before {
            warn!(
                file = %path.display(),
                dropped = before - bars.len(),
                "dropped rows with duplicate dates"
            );
        }
        debug!(symbol, bars = bars.len(), "loaded price file");
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QtraderError> {
        let mut bars = self.read_bars(symbol)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, QtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            QtraderError::data(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| QtraderError::data(format!("directory entry error: {}", e)))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QtraderError> {
        let bars = self.read_bars(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

/// Reads a `date,equity` CSV into a curve sorted by date. Unlike price
/// files, every row must parse.
pub fn read_equity_curve(path: &Path) -> Result<EquityCurve, QtraderError> {
    let mut rdr = open_reader(path)?;
    let headers = rdr.headers().map_err(|e| csv_error(path, e))?.clone();
    let date_col = find_column(&headers, "date")
        .ok_or_else(|| QtraderError::data(format!("{}: missing 'date' column", path.display())))?;
    let equity_col = find_column(&headers, "equity").ok_or_else(|| {
        QtraderError::data(format!("{}: missing 'equity' column", path.display()))
    })?;

    let mut points = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let bad_row = |what: &str| {
            QtraderError::data(format!("{} line {}: {}", path.display(), line + 2, what))
        };
        let date = record
            .get(date_col)
            .and_then(parse_date)
            .ok_or_else(|| bad_row("invalid date"))?;
        let equity = parse_number(record.get(equity_col)).ok_or_else(|| bad_row("invalid equity"))?;
        points.push(EquityPoint { date, equity });
    }

    if points.is_empty() {
        return Err(QtraderError::data(format!(
            "{}: no equity rows",
            path.display()
        )));
    }
    points.sort_by_key(|p| p.date);
    if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(QtraderError::data(format!(
            "{}: duplicate date {}",
            path.display(),
            pair[0].date
        )));
    }
    Ok(EquityCurve::new(points))
}

struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord, path: &Path) -> Result<Self, QtraderError> {
        let required = |name: &str| {
            find_column(headers, name).ok_or_else(|| {
                QtraderError::data(format!("{}: missing '{}' column", path.display(), name))
            })
        };
        Ok(Columns {
            date: required("date")?,
            open: find_column(headers, "open"),
            high: find_column(headers, "high"),
            low: find_column(headers, "low"),
            close: required("close")?,
            volume: find_column(headers, "volume"),
        })
    }

    fn parse_bar(&self, record: &StringRecord) -> Result<OhlcvBar, &'static str> {
        let date = record
            .get(self.date)
            .and_then(parse_date)
            .ok_or("invalid date")?;
        let close = parse_number(record.get(self.close))
            .filter(|c| *c > 0.0)
            .ok_or("unusable close")?;
        let optional = |col: Option<usize>| parse_number(col.and_then(|i| record.get(i)));
        Ok(OhlcvBar {
            date,
            open: optional(self.open),
            high: optional(self.high),
            low: optional(self.low),
            close,
            volume: optional(self.volume),
        })
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, QtraderError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))
}

fn csv_error(path: &Path, err: csv::Error) -> QtraderError {
    QtraderError::data(format!("failed to read {}: {}", path.display(), err))
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

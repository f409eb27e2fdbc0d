//! Price data port.

use crate::domain::error::QtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` with `start_date <= date <= end_date`, oldest first.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, QtraderError>;

    /// First date, last date and bar count, or `None` for an empty source.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QtraderError>;

    /// [`fetch_bars`](DataPort::fetch_bars) validated into a [`PriceSeries`].
    /// An empty range is a `Data` error.
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, QtraderError> {
        let bars = self.fetch_bars(symbol, start_date, end_date)?;
        if bars.is_empty() {
            return Err(QtraderError::data(format!(
                "no bars for {} between {} and {}",
                symbol, start_date, end_date
            )));
        }
        PriceSeries::new(symbol, bars)
    }
}

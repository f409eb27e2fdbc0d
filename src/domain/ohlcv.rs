//! OHLCV bar representation.
//!
//! Only `close` is required for the signal pipeline; the other fields are
//! carried when the data source provides them and read by custom rules.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

impl OhlcvBar {
    /// A bar carrying only a closing price.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        OhlcvBar {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

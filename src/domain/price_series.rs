//! Validated, ordered price history for a single symbol.

use chrono::NaiveDate;

use crate::domain::error::QtraderError;
use crate::domain::ohlcv::OhlcvBar;

/// An immutable OHLCV series with strictly increasing dates and usable
/// closing prices on every bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, QtraderError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(QtraderError::data(format!(
                "no usable bars for {}",
                symbol
            )));
        }

        for (i, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(QtraderError::data(format!(
                    "bar {} ({}) has unusable close {}",
                    i, bar.date, bar.close
                )));
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(QtraderError::data(format!(
                    "dates must be strictly increasing: {} follows {}",
                    bar.date,
                    bars[i - 1].date
                )));
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }
}

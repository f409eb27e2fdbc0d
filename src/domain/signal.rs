//! Tri-state trading signals.

use chrono::NaiveDate;
use serde::Serialize;

/// Directional stance for a bar. Every strategy variant emits this domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Signal {
    Short = -1,
    #[default]
    Flat = 0,
    Long = 1,
}

impl Signal {
    /// Multiplier applied to the market return: +1, 0 or -1.
    pub fn exposure(self) -> f64 {
        match self {
            Signal::Long => 1.0,
            Signal::Flat => 0.0,
            Signal::Short => -1.0,
        }
    }

    /// Long when `left > right`, Short when `left < right`, Flat otherwise.
    pub fn from_ordering(left: f64, right: f64) -> Signal {
        if left > right {
            Signal::Long
        } else if left < right {
            Signal::Short
        } else {
            Signal::Flat
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: Signal,
}

/// Signals aligned 1:1 with the bars of a price series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSeries {
    pub points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn new(points: Vec<SignalPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.points.iter().map(|p| p.signal).collect()
    }
}

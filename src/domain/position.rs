//! Signal-to-position lag.
//!
//! A signal computed from bar `t`'s close can only be acted on for the
//! return of bar `t + 1`, so the position held over bar `t` is the signal
//! of bar `t - 1`.

use chrono::NaiveDate;

use crate::domain::signal::{Signal, SignalSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPoint {
    pub date: NaiveDate,
    pub position: Signal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSeries {
    pub points: Vec<PositionPoint>,
}

impl PositionSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn positions(&self) -> Vec<Signal> {
        self.points.iter().map(|p| p.position).collect()
    }
}

/// `position[0] = Flat`, `position[t] = signal[t - 1]`.
pub fn simulate_positions(signals: &SignalSeries) -> PositionSeries {
    let previous = std::iter::once(Signal::Flat).chain(signals.points.iter().map(|p| p.signal));
    PositionSeries {
        points: signals
            .points
            .iter()
            .zip(previous)
            .map(|(p, position)| PositionPoint {
                date: p.date,
                position,
            })
            .collect(),
    }
}

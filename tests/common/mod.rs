#![allow(dead_code)]

use btcsim::domain::error::BtcsimError;
pub use btcsim::domain::ohlcv::{PriceBar, PriceSeries};
use btcsim::domain::signal::{Prediction, Signal, SignalSource};
use btcsim::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_time(NaiveTime::MIN)
}

pub fn make_bar(day: u32, close: f64) -> PriceBar {
    PriceBar {
        timestamp: ts(day),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000.0,
    }
}

pub fn flat_series(days: u32, price: f64) -> PriceSeries {
    PriceSeries::new((1..=days).map(|d| make_bar(d, price)).collect()).unwrap()
}

pub fn linear_series(days: u32, start_price: f64, step: f64) -> PriceSeries {
    PriceSeries::new(
        (1..=days)
            .map(|d| make_bar(d, start_price + (d - 1) as f64 * step))
            .collect(),
    )
    .unwrap()
}

/// Replays a fixed script of signals, one per bar.
pub struct ScriptedSignal {
    pub signals: Vec<Signal>,
}

impl ScriptedSignal {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self { signals }
    }
}

impl SignalSource for ScriptedSignal {
    fn next_signal(&self, bar_index: usize) -> Result<Signal, BtcsimError> {
        self.signals
            .get(bar_index)
            .copied()
            .ok_or_else(|| BtcsimError::Data {
                reason: format!("no scripted signal for bar {bar_index}"),
            })
    }
}

pub struct MockDataPort {
    pub bars: Vec<PriceBar>,
    pub predictions: Vec<Prediction>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            bars: Vec::new(),
            predictions: Vec::new(),
            error: None,
        }
    }

    pub fn with_bars(mut self, bars: Vec<PriceBar>) -> Self {
        self.bars = bars;
        self
    }

    pub fn with_predictions(mut self, predictions: Vec<Prediction>) -> Self {
        self.predictions = predictions;
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, BtcsimError> {
        if let Some(reason) = &self.error {
            return Err(BtcsimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .cloned()
            .collect())
    }

    fn fetch_predictions(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Prediction>, BtcsimError> {
        if let Some(reason) = &self.error {
            return Err(BtcsimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .predictions
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .cloned()
            .collect())
    }

    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, BtcsimError> {
        if let Some(reason) = &self.error {
            return Err(BtcsimError::Data {
                reason: reason.clone(),
            });
        }
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => {
                Ok(Some((first.timestamp, last.timestamp, self.bars.len())))
            }
            _ => Ok(None),
        }
    }
}

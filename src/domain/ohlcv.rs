//! OHLCV bar and validated price series.

use chrono::{NaiveDateTime, NaiveTime};

use super::error::BtcsimError;

/// A single OHLCV bar. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Time-ordered sequence of price bars.
///
/// Construction enforces the series contract: non-empty, strictly ascending
/// timestamps (no duplicates), positive prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, BtcsimError> {
        if bars.is_empty() {
            return Err(BtcsimError::Data {
                reason: "price series is empty".into(),
            });
        }

        for window in bars.windows(2) {
            if window[1].timestamp <= window[0].timestamp {
                return Err(BtcsimError::Data {
                    reason: format!(
                        "price series not strictly ascending at {}",
                        window[1].timestamp
                    ),
                });
            }
        }

        for bar in &bars {
            if bar.open <= 0.0 || bar.high <= 0.0 || bar.low <= 0.0 || bar.close <= 0.0 {
                return Err(BtcsimError::Data {
                    reason: format!("non-positive price at {}", bar.timestamp),
                });
            }
        }

        Ok(PriceSeries { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &PriceBar {
        &self.bars[0]
    }

    pub fn last(&self) -> &PriceBar {
        &self.bars[self.bars.len() - 1]
    }

    /// Contiguous slice of bars with `start <= timestamp <= end`.
    pub fn window(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[PriceBar] {
        let lo = self.bars.partition_point(|b| b.timestamp < start);
        let hi = self.bars.partition_point(|b| b.timestamp <= end);
        &self.bars[lo..hi]
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS`, falling back to `YYYY-MM-DD` at midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

//! CSV file data adapter.
//!
//! Prices come from an OHLCV file with a `timestamp,open,high,low,close,volume`
//! header; predictions from an optional `timestamp,value` file.

use crate::domain::error::BtcsimError;
use crate::domain::ohlcv::{PriceBar, parse_timestamp};
use crate::domain::signal::Prediction;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use std::fs;
use std::path::PathBuf;

#[derive(Debug)]
pub struct CsvAdapter {
    prices_path: PathBuf,
    predictions_path: Option<PathBuf>,
}

impl CsvAdapter {
    pub fn new(prices_path: PathBuf, predictions_path: Option<PathBuf>) -> Self {
        Self {
            prices_path,
            predictions_path,
        }
    }

    fn read_all_bars(&self) -> Result<Vec<PriceBar>, BtcsimError> {
        let content = fs::read_to_string(&self.prices_path).map_err(|e| BtcsimError::Data {
            reason: format!("failed to read {}: {}", self.prices_path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| BtcsimError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(0).ok_or_else(|| BtcsimError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| BtcsimError::Data {
                reason: format!("invalid timestamp '{}'", ts_str),
            })?;

            bars.push(PriceBar {
                timestamp,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, BtcsimError> {
    record
        .get(index)
        .ok_or_else(|| BtcsimError::Data {
            reason: format!("missing {} column", name),
        })?
        .parse()
        .map_err(|e| BtcsimError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, BtcsimError> {
        let bars = self.read_all_bars()?;
        Ok(bars
            .into_iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .collect())
    }

    fn fetch_predictions(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Prediction>, BtcsimError> {
        let path = self.predictions_path.as_ref().ok_or_else(|| BtcsimError::Data {
            reason: "no predictions file configured".into(),
        })?;
        let content = fs::read_to_string(path).map_err(|e| BtcsimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut predictions = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| BtcsimError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(0).ok_or_else(|| BtcsimError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| BtcsimError::Data {
                reason: format!("invalid timestamp '{}'", ts_str),
            })?;

            if timestamp < start || timestamp > end {
                continue;
            }

            predictions.push(Prediction {
                timestamp,
                value: parse_field(&record, 1, "value")?,
            });
        }

        predictions.sort_by_key(|p| p.timestamp);
        Ok(predictions)
    }

    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, BtcsimError> {
        let bars = self.read_all_bars()?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.timestamp, last.timestamp, bars.len()))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::TempDir;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn setup_test_data() -> (TempDir, CsvAdapter) {
        let dir = TempDir::new().unwrap();
        let prices = dir.path().join("prices.csv");
        let predictions = dir.path().join("predictions.csv");

        fs::write(
            &prices,
            "timestamp,open,high,low,close,volume\n\
             2024-01-17,110.0,120.0,105.0,115.0,55000\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000\n",
        )
        .unwrap();
        fs::write(
            &predictions,
            "timestamp,value\n2024-01-15,1\n2024-01-16,0\n2024-01-17,1\n",
        )
        .unwrap();

        let adapter = CsvAdapter::new(prices, Some(predictions));
        (dir, adapter)
    }

    #[test]
    fn fetch_ohlcv_sorts_and_filters() {
        let (_dir, adapter) = setup_test_data();
        let bars = adapter.fetch_ohlcv(ts(15), ts(17)).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, ts(15));
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[2].timestamp, ts(17));

        let bars = adapter.fetch_ohlcv(ts(16), ts(16)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 110.0);
    }

    #[test]
    fn fetch_ohlcv_missing_file_errors() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/prices.csv"), None);
        assert!(adapter.fetch_ohlcv(ts(1), ts(31)).is_err());
    }

    #[test]
    fn fetch_ohlcv_rejects_bad_rows() {
        let dir = TempDir::new().unwrap();
        let prices = dir.path().join("prices.csv");
        fs::write(
            &prices,
            "timestamp,open,high,low,close,volume\n2024-01-15,abc,110,90,105,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(prices, None);
        assert!(matches!(
            adapter.fetch_ohlcv(ts(1), ts(31)),
            Err(BtcsimError::Data { .. })
        ));
    }

    #[test]
    fn fetch_predictions_filters_window() {
        let (_dir, adapter) = setup_test_data();
        let predictions = adapter.fetch_predictions(ts(16), ts(17)).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].timestamp, ts(16));
        assert_eq!(predictions[0].value, 0.0);
    }

    #[test]
    fn fetch_predictions_without_file_errors() {
        let (_dir, adapter) = setup_test_data();
        let adapter = CsvAdapter::new(adapter.prices_path.clone(), None);
        assert!(adapter.fetch_predictions(ts(1), ts(31)).is_err());
    }

    #[test]
    fn data_range_spans_file() {
        let (_dir, adapter) = setup_test_data();
        let (min, max, count) = adapter.data_range().unwrap().unwrap();
        assert_eq!(min, ts(15));
        assert_eq!(max, ts(17));
        assert_eq!(count, 3);
    }

    #[test]
    fn data_range_empty_file_is_none() {
        let dir = TempDir::new().unwrap();
        let prices = dir.path().join("prices.csv");
        fs::write(&prices, "timestamp,open,high,low,close,volume\n").unwrap();
        let adapter = CsvAdapter::new(prices, None);
        assert_eq!(adapter.data_range().unwrap(), None);
    }
}

//! Data access port trait.

use crate::domain::error::BtcsimError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::Prediction;
use chrono::NaiveDateTime;

pub trait DataPort {
    fn fetch_ohlcv(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, BtcsimError>;

    fn fetch_predictions(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Prediction>, BtcsimError>;

    /// Earliest timestamp, latest timestamp and bar count, if any data exists.
    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, BtcsimError>;
}

//! Trade signals and the sources that produce them.

use chrono::NaiveDateTime;

use super::error::BtcsimError;
use super::indicator::rolling_mean;
use super::ohlcv::PriceBar;

/// Direction hint for a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Up,
    Down,
    Hold,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Up => write!(f, "up"),
            Signal::Down => write!(f, "down"),
            Signal::Hold => write!(f, "hold"),
        }
    }
}

/// An external model prediction tied to a bar timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Produces one signal per bar of the simulation window.
///
/// `bar_index` is the position of the bar within the window the simulation
/// runs over, not within the full series.
pub trait SignalSource {
    fn next_signal(&self, bar_index: usize) -> Result<Signal, BtcsimError>;
}

/// Signals read off a pre-computed prediction table.
///
/// Predictions are matched to window bars by exact timestamp. A bar with no
/// matching prediction yields an alignment error when it is reached, so a
/// run over a gappy prediction file fails mid-run rather than up front.
pub struct ModelPredictionSignal {
    signals: Vec<Option<Signal>>,
    timestamps: Vec<NaiveDateTime>,
}

impl ModelPredictionSignal {
    /// Predictions are direction classes: value >= 0.5 means up, else down.
    pub fn from_directions(bars: &[PriceBar], predictions: &[Prediction]) -> Self {
        Self::build(bars, predictions, |value, _prior_close| {
            if value >= 0.5 { Signal::Up } else { Signal::Down }
        })
    }

    /// Predictions are price forecasts; direction is the sign of the move
    /// against the prior close. The first bar compares against its own close.
    pub fn from_predicted_prices(bars: &[PriceBar], predictions: &[Prediction]) -> Self {
        Self::build(bars, predictions, |value, prior_close| {
            if value > prior_close {
                Signal::Up
            } else if value < prior_close {
                Signal::Down
            } else {
                Signal::Hold
            }
        })
    }

    fn build(
        bars: &[PriceBar],
        predictions: &[Prediction],
        classify: impl Fn(f64, f64) -> Signal,
    ) -> Self {
        let mut signals = Vec::with_capacity(bars.len());
        let mut timestamps = Vec::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            let prior_close = if i == 0 { bar.close } else { bars[i - 1].close };
            let matched = predictions
                .iter()
                .find(|p| p.timestamp == bar.timestamp)
                .map(|p| classify(p.value, prior_close));
            signals.push(matched);
            timestamps.push(bar.timestamp);
        }
        ModelPredictionSignal { signals, timestamps }
    }
}

impl SignalSource for ModelPredictionSignal {
    fn next_signal(&self, bar_index: usize) -> Result<Signal, BtcsimError> {
        match self.signals.get(bar_index) {
            Some(Some(signal)) => Ok(*signal),
            Some(None) => Err(BtcsimError::Alignment {
                timestamp: self.timestamps[bar_index],
            }),
            None => Err(BtcsimError::Data {
                reason: format!("signal requested for bar {bar_index} past end of window"),
            }),
        }
    }
}

/// Moving-average crossover: up while the short mean is above the long mean,
/// down while below, hold during warmup or when the means are equal.
pub struct TechnicalIndicatorSignal {
    short: Vec<Option<f64>>,
    long: Vec<Option<f64>>,
}

impl TechnicalIndicatorSignal {
    pub fn new(bars: &[PriceBar], short_period: usize, long_period: usize) -> Result<Self, BtcsimError> {
        if short_period == 0 || short_period >= long_period {
            return Err(BtcsimError::InvalidConfig {
                reason: format!(
                    "crossover periods must satisfy 0 < short < long, got {short_period}/{long_period}"
                ),
            });
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        Ok(TechnicalIndicatorSignal {
            short: rolling_mean(&closes, short_period),
            long: rolling_mean(&closes, long_period),
        })
    }
}

impl SignalSource for TechnicalIndicatorSignal {
    fn next_signal(&self, bar_index: usize) -> Result<Signal, BtcsimError> {
        if bar_index >= self.long.len() {
            return Err(BtcsimError::Data {
                reason: format!("signal requested for bar {bar_index} past end of window"),
            });
        }
        match (self.short[bar_index], self.long[bar_index]) {
            (Some(short), Some(long)) if short > long => Ok(Signal::Up),
            (Some(short), Some(long)) if short < long => Ok(Signal::Down),
            _ => Ok(Signal::Hold),
        }
    }
}

/// Deterministic exercise source: every `interval` bars it emits a signal,
/// alternating up and down, starting with up. All other bars hold.
pub struct AlternatingSignal {
    interval: usize,
}

impl AlternatingSignal {
    pub fn new(interval: usize) -> Result<Self, BtcsimError> {
        if interval == 0 {
            return Err(BtcsimError::InvalidConfig {
                reason: "alternating interval must be at least 1".into(),
            });
        }
        Ok(AlternatingSignal { interval })
    }
}

impl SignalSource for AlternatingSignal {
    fn next_signal(&self, bar_index: usize) -> Result<Signal, BtcsimError> {
        let step = bar_index + 1;
        if step % self.interval != 0 {
            return Ok(Signal::Hold);
        }
        let emission = step / self.interval;
        if emission % 2 == 1 {
            Ok(Signal::Up)
        } else {
            Ok(Signal::Down)
        }
    }
}

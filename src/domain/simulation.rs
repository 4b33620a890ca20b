//! Simulation driver: walks the price window bar by bar.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::BtcsimError;
use super::executor::{AllInPolicy, ExecutionOutcome, FixedFractionPolicy, SizingPolicy, TradeExecutor};
use super::metrics::{DEFAULT_PERIODS_PER_YEAR, SimulationResult, evaluate};
use super::ohlcv::PriceSeries;
use super::portfolio::Portfolio;
use super::signal::{Signal, SignalSource};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub fee_rate: f64,
    /// Fixed adverse price adjustment per order, as a fraction.
    pub slippage_rate: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Fraction of cash committed per buy. `None` trades all-in.
    pub sizing_fraction: Option<f64>,
    pub periods_per_year: f64,
}

impl SimulationConfig {
    pub fn new(
        initial_capital: f64,
        fee_rate: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        SimulationConfig {
            initial_capital,
            fee_rate,
            slippage_rate: 0.0,
            start,
            end,
            sizing_fraction: None,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }

    pub fn validate(&self) -> Result<(), BtcsimError> {
        if self.start >= self.end {
            return Err(BtcsimError::InvalidConfig {
                reason: format!("start {} must precede end {}", self.start, self.end),
            });
        }
        if self.initial_capital <= 0.0 {
            return Err(BtcsimError::InvalidConfig {
                reason: format!("initial capital must be positive, got {}", self.initial_capital),
            });
        }
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(BtcsimError::InvalidConfig {
                reason: format!("fee rate must be in [0, 1), got {}", self.fee_rate),
            });
        }
        if !(0.0..1.0).contains(&self.slippage_rate) {
            return Err(BtcsimError::InvalidConfig {
                reason: format!("slippage rate must be in [0, 1), got {}", self.slippage_rate),
            });
        }
        if let Some(fraction) = self.sizing_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(BtcsimError::InvalidConfig {
                    reason: format!("sizing fraction must be in (0, 1], got {fraction}"),
                });
            }
        }
        if self.periods_per_year <= 0.0 {
            return Err(BtcsimError::InvalidConfig {
                reason: format!("periods per year must be positive, got {}", self.periods_per_year),
            });
        }
        Ok(())
    }
}

/// Terminal state of a run. Runs are synchronous, so intermediate states
/// never escape `run_simulation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    Completed,
    Failed,
}

/// A signal whose order could not be filled; the run keeps going.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSignal {
    pub timestamp: NaiveDateTime,
    pub signal: Signal,
    pub reason: String,
}

/// Cooperative cancellation flag, checked once per bar.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Everything a run produced, whether it finished or not.
///
/// `result` is `Some` only for completed runs. A failed run keeps the
/// portfolio, trade history, and equity curve accumulated up to the bar
/// that failed, with the cause in `failure`.
#[derive(Debug)]
pub struct SimulationRun {
    pub state: SimulationState,
    pub portfolio: Portfolio,
    pub skipped: Vec<SkippedSignal>,
    pub result: Option<SimulationResult>,
    pub failure: Option<BtcsimError>,
}

/// Run a simulation over the bars of `series` that fall inside the config
/// window.
///
/// Returns `Err` only for problems detected before any state is touched:
/// an invalid config or an empty window. Mid-run failures (a misaligned
/// signal source, cancellation) come back as an `Ok` run in the failed
/// state so partial history is not lost.
pub fn run_simulation(
    series: &PriceSeries,
    source: &dyn SignalSource,
    config: &SimulationConfig,
    cancel: Option<&CancelToken>,
) -> Result<SimulationRun, BtcsimError> {
    config.validate()?;

    let window = series.window(config.start, config.end);
    if window.is_empty() {
        return Err(BtcsimError::NoData {
            start: config.start,
            end: config.end,
        });
    }

    let policy: Box<dyn SizingPolicy> = match config.sizing_fraction {
        Some(fraction) => Box::new(FixedFractionPolicy { fraction }),
        None => Box::new(AllInPolicy),
    };
    let mut executor = TradeExecutor::new(config.fee_rate, config.slippage_rate, policy);
    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut skipped = Vec::new();

    log::info!(
        "simulation over {} bars, {} to {}",
        window.len(),
        window[0].timestamp,
        window[window.len() - 1].timestamp
    );

    for (i, bar) in window.iter().enumerate() {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                log::warn!("run cancelled at bar {i} ({})", bar.timestamp);
                return Ok(SimulationRun {
                    state: SimulationState::Failed,
                    portfolio,
                    skipped,
                    result: None,
                    failure: Some(BtcsimError::Cancelled),
                });
            }
        }

        let signal = match source.next_signal(i) {
            Ok(signal) => signal,
            Err(err) => {
                log::error!("signal source failed at bar {i}: {err}");
                return Ok(SimulationRun {
                    state: SimulationState::Failed,
                    portfolio,
                    skipped,
                    result: None,
                    failure: Some(err),
                });
            }
        };

        match executor.on_signal(signal, bar.timestamp, bar.close, &mut portfolio) {
            ExecutionOutcome::Traded(trade) => portfolio.record_trade(trade),
            ExecutionOutcome::Skipped { signal, reason } => skipped.push(SkippedSignal {
                timestamp: bar.timestamp,
                signal,
                reason,
            }),
            ExecutionOutcome::NoAction => {}
        }

        portfolio.record_equity(bar.timestamp, bar.close);
    }

    let result = evaluate(window, &portfolio, config.periods_per_year);
    Ok(SimulationRun {
        state: SimulationState::Completed,
        portfolio,
        skipped,
        result: Some(result),
        failure: None,
    })
}

//! Turns signals into ledger orders.

use chrono::NaiveDateTime;

use super::portfolio::{Portfolio, Trade};
use super::signal::Signal;

/// Decides order sizes from the current ledger state.
pub trait SizingPolicy {
    fn buy_quantity(&self, cash: f64, price: f64, fee_rate: f64) -> f64;
    fn sell_quantity(&self, held: f64) -> f64;
}

/// Commits the full cash balance to each buy, fee included, and closes the
/// whole position on each sell.
pub struct AllInPolicy;

impl SizingPolicy for AllInPolicy {
    fn buy_quantity(&self, cash: f64, price: f64, fee_rate: f64) -> f64 {
        cash / (price * (1.0 + fee_rate))
    }

    fn sell_quantity(&self, held: f64) -> f64 {
        held
    }
}

/// Commits a fixed fraction of cash per buy, still selling the whole
/// position on exit.
pub struct FixedFractionPolicy {
    pub fraction: f64,
}

impl SizingPolicy for FixedFractionPolicy {
    fn buy_quantity(&self, cash: f64, price: f64, fee_rate: f64) -> f64 {
        (cash * self.fraction) / (price * (1.0 + fee_rate))
    }

    fn sell_quantity(&self, held: f64) -> f64 {
        held
    }
}

/// What the executor did with a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Traded(Trade),
    Skipped { signal: Signal, reason: String },
    NoAction,
}

/// Stateful signal-to-order translation.
///
/// An order fires only when the incoming signal differs from the last signal
/// that actually produced a trade. Hold never becomes the acted-upon signal,
/// and neither does a signal whose order was skipped.
///
/// `slippage_rate` is a fixed adverse price adjustment: buys execute above
/// the bar close, sells below it.
pub struct TradeExecutor {
    fee_rate: f64,
    slippage_rate: f64,
    policy: Box<dyn SizingPolicy>,
    last_acted: Option<Signal>,
}

impl TradeExecutor {
    pub fn new(fee_rate: f64, slippage_rate: f64, policy: Box<dyn SizingPolicy>) -> Self {
        TradeExecutor {
            fee_rate,
            slippage_rate,
            policy,
            last_acted: None,
        }
    }

    pub fn on_signal(
        &mut self,
        signal: Signal,
        timestamp: NaiveDateTime,
        price: f64,
        portfolio: &mut Portfolio,
    ) -> ExecutionOutcome {
        if signal == Signal::Hold || Some(signal) == self.last_acted {
            return ExecutionOutcome::NoAction;
        }

        match signal {
            Signal::Up => {
                let exec_price = price * (1.0 + self.slippage_rate);
                let quantity = self
                    .policy
                    .buy_quantity(portfolio.cash, exec_price, self.fee_rate);
                if quantity <= 0.0 {
                    let reason = "no cash available to open a position".to_string();
                    log::warn!("skipping buy at {timestamp}: {reason}");
                    return ExecutionOutcome::Skipped { signal, reason };
                }
                match portfolio.buy(timestamp, exec_price, quantity, self.fee_rate) {
                    Ok(trade) => {
                        self.last_acted = Some(Signal::Up);
                        ExecutionOutcome::Traded(trade)
                    }
                    Err(err) => {
                        let reason = err.to_string();
                        log::warn!("skipping buy at {timestamp}: {reason}");
                        ExecutionOutcome::Skipped { signal, reason }
                    }
                }
            }
            Signal::Down => {
                if portfolio.asset_qty <= 0.0 {
                    return ExecutionOutcome::NoAction;
                }
                let exec_price = price * (1.0 - self.slippage_rate);
                let quantity = self.policy.sell_quantity(portfolio.asset_qty);
                match portfolio.sell(timestamp, exec_price, quantity, self.fee_rate) {
                    Ok(trade) => {
                        self.last_acted = Some(Signal::Down);
                        ExecutionOutcome::Traded(trade)
                    }
                    Err(err) => {
                        let reason = err.to_string();
                        log::warn!("skipping sell at {timestamp}: {reason}");
                        ExecutionOutcome::Skipped { signal, reason }
                    }
                }
            }
            Signal::Hold => ExecutionOutcome::NoAction,
        }
    }
}

//! Cash and position ledger with average-cost accounting.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::BtcsimError;

/// Slack when comparing order cost against available cash, so an
/// all-in order sized from the cash balance itself is not rejected
/// by float rounding.
const FUNDS_EPSILON: f64 = 1e-9;

/// Slack when comparing a sell quantity against the held quantity.
const QTY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Buy,
    Sell,
}

/// One executed order.
///
/// `realized_pnl` is only set on sells: proceeds minus the average-cost
/// basis of the quantity sold, net of the sell fee and a prorated share
/// of the buy fees paid to open that quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub timestamp: NaiveDateTime,
    pub kind: TradeKind,
    pub price: f64,
    pub quantity: f64,
    pub value: f64,
    pub fee: f64,
    pub realized_pnl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Single-asset portfolio ledger.
///
/// Invariants: cash and asset quantity never go negative, and the average
/// entry price is `Some` exactly while a position is open.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub asset_qty: f64,
    pub avg_entry_price: Option<f64>,
    pub initial_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    open_position_fees: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            asset_qty: 0.0,
            avg_entry_price: None,
            initial_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            open_position_fees: 0.0,
        }
    }

    /// Buy `quantity` at `price`, paying `fee_rate` on the notional value.
    /// Returns the trade record; the caller decides whether to keep it
    /// via [`record_trade`](Self::record_trade).
    pub fn buy(
        &mut self,
        timestamp: NaiveDateTime,
        price: f64,
        quantity: f64,
        fee_rate: f64,
    ) -> Result<Trade, BtcsimError> {
        let value = price * quantity;
        let fee = value * fee_rate;
        let total_cost = value + fee;
        if total_cost > self.cash + FUNDS_EPSILON {
            return Err(BtcsimError::InsufficientFunds {
                required: total_cost,
                available: self.cash,
            });
        }

        let qty_before = self.asset_qty;
        let new_qty = qty_before + quantity;
        let prior_basis = self.avg_entry_price.unwrap_or(0.0) * qty_before;
        self.avg_entry_price = Some((prior_basis + value) / new_qty);
        self.asset_qty = new_qty;
        self.cash = (self.cash - total_cost).max(0.0);
        self.open_position_fees += fee;

        Ok(Trade {
            timestamp,
            kind: TradeKind::Buy,
            price,
            quantity,
            value,
            fee,
            realized_pnl: None,
        })
    }

    /// Sell `quantity` at `price`. Realized profit is measured against the
    /// average entry price of the open position.
    pub fn sell(
        &mut self,
        timestamp: NaiveDateTime,
        price: f64,
        quantity: f64,
        fee_rate: f64,
    ) -> Result<Trade, BtcsimError> {
        if quantity > self.asset_qty + QTY_EPSILON {
            return Err(BtcsimError::InsufficientPosition {
                requested: quantity,
                held: self.asset_qty,
            });
        }

        let qty_before = self.asset_qty;
        let value = price * quantity;
        let fee = value * fee_rate;
        let avg_entry = self.avg_entry_price.unwrap_or(price);
        let buy_fee_share = if qty_before > 0.0 {
            self.open_position_fees * (quantity / qty_before)
        } else {
            0.0
        };
        let realized = (value - quantity * avg_entry) - (buy_fee_share + fee);

        self.cash += value - fee;
        self.asset_qty = qty_before - quantity;
        self.open_position_fees -= buy_fee_share;
        if self.asset_qty <= QTY_EPSILON {
            self.asset_qty = 0.0;
            self.avg_entry_price = None;
            self.open_position_fees = 0.0;
        }

        Ok(Trade {
            timestamp,
            kind: TradeKind::Sell,
            price,
            quantity,
            value,
            fee,
            realized_pnl: Some(realized),
        })
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Cash plus the position valued at `price`.
    pub fn mark_to_market(&self, price: f64) -> f64 {
        self.cash + self.asset_qty * price
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, price: f64) {
        let equity = self.mark_to_market(price);
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }
}

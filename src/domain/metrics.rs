//! Performance evaluation of a finished run.

use serde::Serialize;

use super::ohlcv::PriceBar;
use super::portfolio::{Portfolio, TradeKind};

/// Trading days per year, used to annualize the Sharpe ratio when the
/// config does not override it.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub final_balance: f64,
    pub profit_loss: f64,
    pub roi: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub buy_hold_return: f64,
    pub excess_return: f64,
}

/// Summarize a portfolio against the bars it traded over.
///
/// `bars` is the simulation window; the buy-and-hold baseline is the close
/// of the last bar over the close of the first. Win/loss counts classify
/// sells only, by the sign of their realized profit; breakeven sells count
/// as neither.
pub fn evaluate(bars: &[PriceBar], portfolio: &Portfolio, periods_per_year: f64) -> SimulationResult {
    let final_balance = match portfolio.equity_curve.last() {
        Some(point) => point.equity,
        None => portfolio.initial_capital,
    };
    let profit_loss = final_balance - portfolio.initial_capital;
    let roi = if portfolio.initial_capital > 0.0 {
        profit_loss / portfolio.initial_capital
    } else {
        0.0
    };

    let period_days = period_days(portfolio);
    let annualized_return = if period_days > 0.0 && 1.0 + roi > 0.0 {
        (1.0 + roi).powf(365.0 / period_days) - 1.0
    } else {
        0.0
    };

    let sharpe_ratio = sharpe(&equity_returns(portfolio), periods_per_year);
    let max_drawdown = max_drawdown(portfolio);

    let sells: Vec<f64> = portfolio
        .trades
        .iter()
        .filter(|t| t.kind == TradeKind::Sell)
        .filter_map(|t| t.realized_pnl)
        .collect();
    let winning_trades = sells.iter().filter(|pnl| **pnl > 0.0).count();
    let losing_trades = sells.iter().filter(|pnl| **pnl < 0.0).count();
    let win_rate = if sells.is_empty() {
        0.0
    } else {
        winning_trades as f64 / sells.len() as f64
    };

    let buy_hold_return = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) if first.close > 0.0 => last.close / first.close - 1.0,
        _ => 0.0,
    };

    SimulationResult {
        final_balance,
        profit_loss,
        roi,
        annualized_return,
        sharpe_ratio,
        max_drawdown,
        total_trades: portfolio.trades.len(),
        winning_trades,
        losing_trades,
        win_rate,
        buy_hold_return,
        excess_return: roi - buy_hold_return,
    }
}

fn period_days(portfolio: &Portfolio) -> f64 {
    match (portfolio.equity_curve.first(), portfolio.equity_curve.last()) {
        (Some(first), Some(last)) => {
            (last.timestamp - first.timestamp).num_seconds() as f64 / 86_400.0
        }
        _ => 0.0,
    }
}

fn equity_returns(portfolio: &Portfolio) -> Vec<f64> {
    portfolio
        .equity_curve
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| w[1].equity / w[0].equity - 1.0)
        .collect()
}

fn sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (returns.len() - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return 0.0;
    }
    mean / std_dev * periods_per_year.sqrt()
}

fn max_drawdown(portfolio: &Portfolio) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;
    for point in &portfolio.equity_curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.max((peak - point.equity) / peak);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            timestamp: ts(day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn zero_trades_is_flat_result() {
        let bars = vec![bar(1, 100.0), bar(2, 110.0)];
        let mut p = Portfolio::new(10_000.0);
        p.record_equity(ts(1), 100.0);
        p.record_equity(ts(2), 110.0);
        let result = evaluate(&bars, &p, DEFAULT_PERIODS_PER_YEAR);
        assert_relative_eq!(result.final_balance, 10_000.0);
        assert_relative_eq!(result.roi, 0.0);
        assert_relative_eq!(result.sharpe_ratio, 0.0);
        assert_relative_eq!(result.max_drawdown, 0.0);
        assert_relative_eq!(result.win_rate, 0.0);
        assert_eq!(result.total_trades, 0);
        assert_relative_eq!(result.buy_hold_return, 0.1, epsilon = 1e-12);
        assert_relative_eq!(result.excess_return, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn roi_and_annualization() {
        let bars = vec![bar(1, 100.0), bar(31, 100.0)];
        let mut p = Portfolio::new(10_000.0);
        p.cash = 11_000.0;
        p.record_equity(ts(1), 100.0);
        p.record_equity(ts(31), 100.0);
        let result = evaluate(&bars, &p, DEFAULT_PERIODS_PER_YEAR);
        assert_relative_eq!(result.roi, 0.1, epsilon = 1e-12);
        // 30-day period compounds to (1.1)^(365/30) - 1
        assert_relative_eq!(
            result.annualized_return,
            1.1f64.powf(365.0 / 30.0) - 1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn drawdown_from_peak() {
        let mut p = Portfolio::new(1_000.0);
        for (day, equity) in [(1, 1_000.0), (2, 1_200.0), (3, 900.0), (4, 1_100.0)] {
            p.equity_curve.push(crate::domain::portfolio::EquityPoint {
                timestamp: ts(day),
                equity,
            });
        }
        let result = evaluate(&[bar(1, 100.0)], &p, DEFAULT_PERIODS_PER_YEAR);
        assert_relative_eq!(result.max_drawdown, 300.0 / 1_200.0, epsilon = 1e-12);
    }

    #[test]
    fn win_rate_counts_sells_only() {
        let mut p = Portfolio::new(10_000.0);
        p.buy(ts(1), 100.0, 10.0, 0.0).map(|t| p.record_trade(t)).unwrap();
        p.sell(ts(2), 120.0, 5.0, 0.0).map(|t| p.record_trade(t)).unwrap();
        p.sell(ts(3), 80.0, 5.0, 0.0).map(|t| p.record_trade(t)).unwrap();
        p.record_equity(ts(3), 80.0);
        let result = evaluate(&[bar(1, 100.0), bar(3, 80.0)], &p, DEFAULT_PERIODS_PER_YEAR);
        assert_eq!(result.total_trades, 3);
        assert_eq!(result.winning_trades, 1);
        assert_eq!(result.losing_trades, 1);
        assert_relative_eq!(result.win_rate, 0.5);
    }

    #[test]
    fn constant_returns_give_zero_sharpe() {
        let mut p = Portfolio::new(1_000.0);
        for day in 1..=5 {
            p.equity_curve.push(crate::domain::portfolio::EquityPoint {
                timestamp: ts(day),
                equity: 1_000.0 * 1.01f64.powi(day as i32),
            });
        }
        let result = evaluate(&[bar(1, 100.0)], &p, DEFAULT_PERIODS_PER_YEAR);
        assert_relative_eq!(result.sharpe_ratio, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn sharpe_scales_with_periods_per_year() {
        let mut p = Portfolio::new(1_000.0);
        for (day, equity) in [(1, 1_000.0), (2, 1_010.0), (3, 1_005.0), (4, 1_020.0)] {
            p.equity_curve.push(crate::domain::portfolio::EquityPoint {
                timestamp: ts(day),
                equity: equity as f64,
            });
        }
        let daily = evaluate(&[bar(1, 100.0)], &p, 252.0);
        let hourly = evaluate(&[bar(1, 100.0)], &p, 252.0 * 24.0);
        assert_relative_eq!(
            hourly.sharpe_ratio,
            daily.sharpe_ratio * 24.0f64.sqrt(),
            epsilon = 1e-9
        );
    }
}

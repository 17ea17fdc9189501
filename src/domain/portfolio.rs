//! Cash, position and equity tracking for a single-instrument backtest.

use chrono::NaiveDate;
use std::fmt;

use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub quantity: f64,
    pub price: f64,
    pub cost: f64,
    pub pnl: f64,
    pub position_after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    /// `(equity - peak) / peak`, always <= 0.
    pub drawdown: f64,
    /// Signed shares held at the close.
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Position,
    pub peak_equity: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            position: Position::default(),
            peak_equity: initial_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    /// Move to `target_shares` at `price`, paying `cost`. Returns the recorded trade.
    pub fn execute(
        &mut self,
        date: NaiveDate,
        target_shares: f64,
        price: f64,
        cost: f64,
    ) -> &Trade {
        let delta = target_shares - self.position.shares;
        let pnl = self.position.rebalance(target_shares, price);
        self.cash -= delta * price + cost;
        let action = if delta > 0.0 {
            TradeAction::Buy
        } else {
            TradeAction::Sell
        };
        self.trades.push(Trade {
            date,
            action,
            quantity: delta.abs(),
            price,
            cost,
            pnl,
            position_after: self.position.shares,
        });
        &self.trades[self.trades.len() - 1]
    }

    /// Append an equity point at `price`, updating the running peak when `track_peak`.
    pub fn record_equity(&mut self, date: NaiveDate, price: f64, track_peak: bool) -> f64 {
        let equity = self.total_equity(price);
        if track_peak && equity > self.peak_equity {
            self.peak_equity = equity;
        }
        let drawdown = if self.peak_equity > 0.0 {
            ((equity - self.peak_equity) / self.peak_equity).min(0.0)
        } else {
            0.0
        };
        self.equity_curve.push(EquityPoint {
            date,
            equity,
            drawdown,
            position: self.position.shares,
        });
        equity
    }
}

//! Backtest performance metrics.

use super::features::rolling::{mean, sample_std};
use super::portfolio::{EquityPoint, Trade};
use super::position::SHARE_EPSILON;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Worst peak-to-trough fall, as a negative fraction.
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub win_rate: f64,
    /// Gross profit over gross loss; `None` when nothing lost.
    pub profit_factor: Option<f64>,
    pub turnover: f64,
    pub exposure: f64,
    pub total_trades: usize,
    pub total_return: f64,
    pub final_equity: f64,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade]) -> Self {
        let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
            return Metrics::default();
        };

        let start_equity = first.equity;
        let final_equity = last.equity;
        let total_return = if start_equity > 0.0 {
            final_equity / start_equity - 1.0
        } else {
            0.0
        };

        let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
        let cagr = if years > 0.0 && start_equity > 0.0 && final_equity > 0.0 {
            (final_equity / start_equity).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (sharpe, sortino) = compute_risk_adjusted(equity_curve);
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let mut wins = 0usize;
        let mut decided = 0usize;
        let mut gross_profit = 0.0;
        let mut gross_loss = 0.0;
        for t in trades {
            if t.pnl > 0.0 {
                wins += 1;
                decided += 1;
                gross_profit += t.pnl;
            } else if t.pnl < 0.0 {
                decided += 1;
                gross_loss += t.pnl.abs();
            }
        }
        let win_rate = if decided > 0 {
            wins as f64 / decided as f64
        } else {
            0.0
        };
        let profit_factor = if gross_loss > 0.0 {
            Some(gross_profit / gross_loss)
        } else {
            None
        };

        let days = equity_curve.len() as f64;
        let total_trades = trades.len();
        let turnover = total_trades as f64 / days;
        let held = equity_curve
            .iter()
            .filter(|p| p.position.abs() > SHARE_EPSILON)
            .count();
        let exposure = (held as f64 / days).clamp(0.0, 1.0);

        Metrics {
            cagr,
            sharpe,
            sortino,
            max_drawdown,
            max_drawdown_duration,
            win_rate,
            profit_factor,
            turnover,
            exposure,
            total_trades,
            total_return,
            final_equity,
        }
    }
}

fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| w[1].equity / w[0].equity - 1.0)
        .collect()
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint]) -> (f64, f64) {
    let returns = daily_returns(equity_curve);
    let Some(std) = sample_std(&returns) else {
        return (0.0, 0.0);
    };
    let m = mean(&returns);

    let sharpe = if std > 0.0 {
        m / std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside / returns.len() as f64).sqrt();
    let sortino = if downside_std > 0.0 {
        m / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut run = 0usize;
    let mut longest = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            run = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.min((point.equity - peak) / peak);
            run += 1;
            longest = longest.max(run);
        }
    }

    (max_dd, longest)
}

//! Backtest engine and event loop.
//!
//! The loop walks bars in date order. The decision on bar `t` is made from
//! features and signals that read bars dated `<= t` only; features are
//! computed once over the whole input because each feature row is a function
//! of its own prefix. Bars before `start` act purely as warm-up history.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::constraints::RiskConstraints;
use super::costs::TransactionCostModel;
use super::ensemble::{Direction, EnsembleModel, Forecast};
use super::error::TradecastError;
use super::features::FeatureFrame;
use super::features::volatility::{TRADING_DAYS_PER_YEAR, VOL_WINDOW, daily_vol};
use super::metrics::Metrics;
use super::ohlcv::{OhlcvBar, closes};
use super::portfolio::{EquityPoint, Portfolio, Trade};
use super::position::SHARE_EPSILON;
use super::signal::{self, Signal, default_signals};
use super::sizing::{SizingParams, compute_position_size};

/// Stands in for the ticker in errors; the engine only sees bars.
const SERIES_LABEL: &str = "price series";

/// Bars required before the first decision.
pub const MIN_HISTORY_BARS: usize = 60;

/// Daily vol assumed when the rolling estimate is unavailable (20% annualised).
pub fn default_daily_vol() -> f64 {
    0.2 / TRADING_DAYS_PER_YEAR.sqrt()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub sizing: SizingParams,
    pub constraints: RiskConstraints,
    pub costs: TransactionCostModel,
    pub min_history: usize,
    pub vol_window: usize,
    pub allow_shorting: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 100_000.0,
            sizing: SizingParams::default(),
            constraints: RiskConstraints::default(),
            costs: TransactionCostModel::default(),
            min_history: MIN_HISTORY_BARS,
            vol_window: VOL_WINDOW,
            allow_shorting: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub metrics: Metrics,
    pub last_forecast: Option<Forecast>,
    /// Set when a risk stop ended the simulation early.
    pub stopped_on: Option<NaiveDate>,
}

pub struct BacktestEngine {
    config: BacktestConfig,
    ensemble: EnsembleModel,
    signals: Vec<Box<dyn Signal + Send + Sync>>,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig, ensemble: EnsembleModel) -> Self {
        BacktestEngine {
            config,
            ensemble,
            signals: default_signals(),
        }
    }

    pub fn with_signals(mut self, signals: Vec<Box<dyn Signal + Send + Sync>>) -> Self {
        self.signals = signals;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Simulate over `[start, end]`, defaulting to the full span of `bars`.
    pub fn run(
        &self,
        bars: &[OhlcvBar],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<BacktestResult, TradecastError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(TradecastError::NoData {
                ticker: SERIES_LABEL.into(),
                start: start.map_or_else(|| "-".into(), |d| d.to_string()),
                end: end.map_or_else(|| "-".into(), |d| d.to_string()),
            });
        };
        let start = start.unwrap_or(first.date);
        let end = end.unwrap_or(last.date);

        let history = &bars[..bars.partition_point(|b| b.date <= end)];
        let from = history.partition_point(|b| b.date < start);
        if from >= history.len() {
            return Err(TradecastError::NoData {
                ticker: SERIES_LABEL.into(),
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        info!(
            from = %history[from].date,
            to = %history[history.len() - 1].date,
            warmup_bars = from,
            "starting backtest"
        );

        let frame = FeatureFrame::compute(history);
        let vols = daily_vol(&closes(history), self.config.vol_window);
        let cfg = &self.config;

        let mut portfolio = Portfolio::new(cfg.initial_capital);
        let mut prev_direction = Direction::Flat;
        let mut prev_confidence = 0.0;
        let mut last_forecast = None;
        let mut stopped_on = None;

        for (i, bar) in history.iter().enumerate().skip(from) {
            let price = bar.close;
            if i + 1 < cfg.min_history {
                portfolio.record_equity(bar.date, price, false);
                continue;
            }

            let results = signal::evaluate(&self.signals, &frame, bar.date);
            let forecast = self.ensemble.combine(&results, bar.date);

            let equity = portfolio.total_equity(price);
            if cfg.constraints.drawdown_stop(equity, portfolio.peak_equity) {
                stopped_on = Some(bar.date);
                break;
            }
            if equity <= 0.0 {
                info!(date = %bar.date, equity, "equity exhausted");
                stopped_on = Some(bar.date);
                break;
            }

            let daily_return = portfolio
                .equity_curve
                .last()
                .filter(|p| p.equity > 0.0)
                .map_or(0.0, |p| equity / p.equity - 1.0);
            let halted = cfg.constraints.daily_loss_stop(daily_return);

            let mut direction = forecast.direction;
            if halted || (direction == Direction::Short && !cfg.allow_shorting) {
                direction = Direction::Flat;
            }

            let vol = vols[i].filter(|v| *v > 0.0).unwrap_or_else(default_daily_vol);
            let size = cfg.constraints.apply_leverage(compute_position_size(
                direction,
                forecast.confidence,
                vol,
                &cfg.sizing,
            ));
            let target = if price > 0.0 {
                direction.sign() * equity * size / price
            } else {
                0.0
            };

            let should_trade = halted
                || cfg.constraints.should_trade(
                    direction,
                    prev_direction,
                    forecast.confidence,
                    prev_confidence,
                );
            let delta = target - portfolio.position.shares;
            if delta.abs() > SHARE_EPSILON && should_trade {
                let annual_vol = vol * TRADING_DAYS_PER_YEAR.sqrt();
                let cost = cfg
                    .costs
                    .cost(delta.abs() * price, price, bar.volume, Some(annual_vol));
                let trade = portfolio.execute(bar.date, target, price, cost);
                debug!(
                    date = %trade.date,
                    action = %trade.action,
                    quantity = trade.quantity,
                    price = trade.price,
                    pnl = trade.pnl,
                    "trade"
                );
            }

            prev_direction = direction;
            prev_confidence = forecast.confidence;
            last_forecast = Some(forecast);
            portfolio.record_equity(bar.date, price, true);
        }

        let metrics = Metrics::compute(&portfolio.equity_curve, &portfolio.trades);
        info!(
            cagr = metrics.cagr,
            sharpe = metrics.sharpe,
            max_drawdown = metrics.max_drawdown,
            trades = metrics.total_trades,
            "backtest complete"
        );

        Ok(BacktestResult {
            equity_curve: portfolio.equity_curve,
            trades: portfolio.trades,
            metrics,
            last_forecast,
            stopped_on,
        })
    }
}

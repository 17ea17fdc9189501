//! Walk-forward evaluation over rolling train/test windows.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use super::ensemble::EnsembleModel;
use super::error::TradecastError;
use super::metrics::Metrics;
use super::ohlcv::{OhlcvBar, slice_range};
use super::portfolio::{EquityPoint, Trade};
use super::signal::{SignalKind, default_signals};
use super::weight_optimizer::WeightOptimizer;

const DAYS_PER_YEAR: i64 = 365;
const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardConfig {
    pub train_years: u32,
    pub test_months: u32,
    pub step_months: u32,
    pub optimize_weights: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        WalkForwardConfig {
            train_years: 1,
            test_months: 3,
            step_months: 1,
            optimize_weights: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult {
    pub window: Window,
    pub metrics: Metrics,
    /// Weights fitted on the training window, when optimisation ran and succeeded.
    pub weights: Option<BTreeMap<SignalKind, f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
    /// Chained test-window equity, one point per date. Each window covers
    /// the dates up to the next window's `test_start` and starts from the
    /// equity the previous window ended on.
    pub equity_curve: Vec<EquityPoint>,
    /// Trades dated inside the span each window contributes.
    pub trades: Vec<Trade>,
    pub metrics: Metrics,
}

/// Train/test windows covering `[start, end)`.
pub fn generate_windows(
    config: &WalkForwardConfig,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Window> {
    let train = Duration::days(i64::from(config.train_years) * DAYS_PER_YEAR);
    let test = Duration::days(i64::from(config.test_months) * DAYS_PER_MONTH);
    let step = Duration::days(i64::from(config.step_months.max(1)) * DAYS_PER_MONTH);

    let mut windows = Vec::new();
    let mut current = start + train;
    while current < end {
        windows.push(Window {
            train_start: current - train,
            train_end: current - Duration::days(1),
            test_start: current,
            test_end: (current + test).min(end),
        });
        current += step;
    }
    windows
}

pub struct WalkForwardEvaluator {
    config: WalkForwardConfig,
    backtest: BacktestConfig,
    base_model: EnsembleModel,
    optimizer: WeightOptimizer,
}

impl WalkForwardEvaluator {
    pub fn new(
        config: WalkForwardConfig,
        backtest: BacktestConfig,
        base_model: EnsembleModel,
    ) -> Self {
        WalkForwardEvaluator {
            config,
            backtest,
            base_model,
            optimizer: WeightOptimizer::default(),
        }
    }

    pub fn evaluate(
        &self,
        bars: &[OhlcvBar],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WalkForwardResult, TradecastError> {
        let windows = generate_windows(&self.config, start, end);
        info!(windows = windows.len(), %start, %end, "walk-forward evaluation");

        let signals = default_signals();
        let mut results = Vec::with_capacity(windows.len());
        let mut runs = Vec::with_capacity(windows.len());

        for (n, w) in windows.iter().enumerate() {
            if slice_range(bars, w.train_start, w.train_end).is_empty()
                || slice_range(bars, w.test_start, w.test_end).is_empty()
            {
                warn!(window = n + 1, "skipping window: insufficient data");
                continue;
            }

            let mut model = self.base_model.clone();
            let weights = if self.config.optimize_weights {
                self.optimizer
                    .optimize(bars, &signals, w.train_start, w.train_end)
            } else {
                None
            };
            if let Some(fitted) = &weights {
                model.signal_weights = Some(fitted.clone());
            }

            info!(
                window = n + 1,
                train_start = %w.train_start,
                test_start = %w.test_start,
                test_end = %w.test_end,
                "running window"
            );
            let engine = BacktestEngine::new(self.backtest.clone(), model);
            let result = engine.run(bars, Some(w.test_start), Some(w.test_end))?;

            results.push(WindowResult {
                window: *w,
                metrics: result.metrics.clone(),
                weights,
            });
            runs.push((w.test_start, result));
        }

        if results.is_empty() {
            return Err(TradecastError::Backtest {
                reason: format!("no walk-forward windows with data between {start} and {end}"),
            });
        }

        let (equity_curve, trades) = stitch(runs, self.backtest.initial_capital);
        let metrics = Metrics::compute(&equity_curve, &trades);
        Ok(WalkForwardResult {
            windows: results,
            equity_curve,
            trades,
            metrics,
        })
    }
}

/// Chain per-window runs into one curve.
///
/// Run `i` keeps only dates before run `i + 1`'s test start; the last run
/// keeps everything. Each kept segment is rescaled from the engine's initial
/// capital to the equity the previous segment ended on, and drawdown is
/// recomputed against the running peak of the chained curve.
fn stitch(
    runs: Vec<(NaiveDate, BacktestResult)>,
    initial_capital: f64,
) -> (Vec<EquityPoint>, Vec<Trade>) {
    let cutoffs: Vec<Option<NaiveDate>> = runs
        .iter()
        .skip(1)
        .map(|(test_start, _)| Some(*test_start))
        .chain(std::iter::once(None))
        .collect();

    let mut points: Vec<EquityPoint> = Vec::new();
    let mut trades = Vec::new();
    let mut capital = initial_capital;
    let mut peak = initial_capital;

    for ((_, run), cutoff) in runs.into_iter().zip(cutoffs) {
        if capital <= 0.0 || initial_capital <= 0.0 {
            break;
        }
        let scale = capital / initial_capital;
        let before_cutoff = |d: NaiveDate| cutoff.is_none_or(|c| d < c);

        for p in run.equity_curve.into_iter().filter(|p| before_cutoff(p.date)) {
            let equity = p.equity * scale;
            peak = peak.max(equity);
            points.push(EquityPoint {
                date: p.date,
                equity,
                drawdown: ((equity - peak) / peak).min(0.0),
                position: p.position * scale,
            });
        }
        trades.extend(
            run.trades
                .into_iter()
                .filter(|t| before_cutoff(t.date))
                .map(|t| Trade {
                    quantity: t.quantity * scale,
                    cost: t.cost * scale,
                    pnl: t.pnl * scale,
                    position_after: t.position_after * scale,
                    ..t
                }),
        );
        if let Some(last) = points.last() {
            capital = last.equity;
        }
    }
    (points, trades)
}

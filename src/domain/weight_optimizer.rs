//! Ensemble weight fitting over a training window.
//!
//! Each trading signal contributes one regressor, `score * confidence`, and
//! the target is the forward return over `horizon` bars. Coefficients are
//! fitted by non-negative least squares without intercept (projected
//! coordinate descent) and normalised to sum to 1.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::features::FeatureFrame;
use super::ohlcv::OhlcvBar;
use super::signal::{self, Signal, SignalKind};

pub const FORWARD_HORIZON: usize = 5;
pub const MIN_SAMPLES: usize = 20;

const MAX_SWEEPS: usize = 500;
const TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightOptimizer {
    pub horizon: usize,
    pub min_samples: usize,
}

impl Default for WeightOptimizer {
    fn default() -> Self {
        WeightOptimizer {
            horizon: FORWARD_HORIZON,
            min_samples: MIN_SAMPLES,
        }
    }
}

impl WeightOptimizer {
    /// Fit weights from the bars dated within `[train_start, train_end]`.
    ///
    /// Bars before `train_start` are used only as feature history. Returns
    /// `None` when there are too few usable samples or nothing fits.
    pub fn optimize(
        &self,
        bars: &[OhlcvBar],
        signals: &[Box<dyn Signal + Send + Sync>],
        train_start: NaiveDate,
        train_end: NaiveDate,
    ) -> Option<BTreeMap<SignalKind, f64>> {
        let history = &bars[..bars.partition_point(|b| b.date <= train_end)];
        let frame = FeatureFrame::compute(history);

        let kinds: Vec<SignalKind> = signals
            .iter()
            .map(|s| s.kind())
            .filter(|k| !k.is_regime())
            .collect();
        if kinds.is_empty() {
            warn!("no trading signals to optimise");
            return None;
        }

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for (i, bar) in history.iter().enumerate() {
            if bar.date < train_start {
                continue;
            }
            let Some(ahead) = history.get(i + self.horizon) else {
                break;
            };
            if bar.close <= 0.0 {
                continue;
            }
            let target = ahead.close / bar.close - 1.0;

            let results = signal::evaluate(signals, &frame, bar.date);
            let row: Vec<f64> = kinds
                .iter()
                .map(|k| {
                    results
                        .iter()
                        .find(|r| r.kind == *k)
                        .map_or(0.0, |r| r.score * r.confidence)
                })
                .collect();
            if target.is_finite() && row.iter().all(|v| v.is_finite()) {
                rows.push(row);
                targets.push(target);
            }
        }

        if rows.len() < self.min_samples {
            warn!(
                samples = rows.len(),
                minimum = self.min_samples,
                "insufficient data for weight optimisation"
            );
            return None;
        }

        let coef = nnls(&rows, &targets, kinds.len());
        let total: f64 = coef.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            debug!("all fitted weights are zero");
            return None;
        }

        let weights: BTreeMap<SignalKind, f64> = kinds
            .into_iter()
            .zip(coef)
            .map(|(k, w)| (k, w / total))
            .collect();
        info!(?weights, samples = rows.len(), "optimised ensemble weights");
        Some(weights)
    }
}

/// Non-negative least squares `min |Xw - y|^2, w >= 0` by coordinate descent.
pub fn nnls(x: &[Vec<f64>], y: &[f64], cols: usize) -> Vec<f64> {
    let mut w = vec![0.0; cols];
    let mut residual = y.to_vec();
    let norms: Vec<f64> = (0..cols)
        .map(|j| x.iter().map(|row| row[j] * row[j]).sum())
        .collect();

    for _ in 0..MAX_SWEEPS {
        let mut max_step = 0.0_f64;
        for j in 0..cols {
            if norms[j] <= 0.0 {
                continue;
            }
            let grad: f64 = x.iter().zip(&residual).map(|(row, r)| row[j] * r).sum();
            let updated = (w[j] + grad / norms[j]).max(0.0);
            let step = updated - w[j];
            if step != 0.0 {
                for (row, r) in x.iter().zip(residual.iter_mut()) {
                    *r -= step * row[j];
                }
                w[j] = updated;
                max_step = max_step.max(step.abs());
            }
        }
        if max_step < TOLERANCE {
            break;
        }
    }
    w
}

//! Weighted ensemble of signals into a single forecast.
//!
//! Direction comes from the weighted sum of trading-signal scores only.
//! Confidence is tracked separately and feeds position sizing. The regime
//! signal never votes on direction; it scales both the score and the
//! confidence, blended in by `regime_weight`.

use super::signal::{SignalKind, SignalResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

pub const MAX_CONTRIBUTORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Flat,
    Short,
}

impl Direction {
    /// +1, 0 or -1.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Flat => 0.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Flat => "flat",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contributor {
    pub signal: String,
    pub kind: SignalKind,
    pub contribution: f64,
    pub weight: f64,
    pub score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub top_contributors: Vec<Contributor>,
    pub regime_description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub date: NaiveDate,
    pub direction: Direction,
    pub confidence: f64,
    pub position_size: f64,
    pub weighted_score: f64,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleModel {
    pub signal_weights: Option<BTreeMap<SignalKind, f64>>,
    pub regime_weight: f64,
    pub threshold: f64,
}

impl Default for EnsembleModel {
    fn default() -> Self {
        EnsembleModel {
            signal_weights: None,
            regime_weight: 0.3,
            threshold: 0.1,
        }
    }
}

impl EnsembleModel {
    pub fn new(
        signal_weights: Option<BTreeMap<SignalKind, f64>>,
        regime_weight: f64,
        threshold: f64,
    ) -> Self {
        EnsembleModel {
            signal_weights,
            regime_weight,
            threshold,
        }
    }

    /// Merge `weights` into the configured weights.
    pub fn update_weights(&mut self, weights: BTreeMap<SignalKind, f64>) {
        self.signal_weights
            .get_or_insert_with(BTreeMap::new)
            .extend(weights);
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    fn resolve_weights(&self, trading: &[&SignalResult]) -> BTreeMap<SignalKind, f64> {
        match &self.signal_weights {
            Some(configured) if !configured.is_empty() => {
                let total: f64 = configured.values().sum();
                if total > 0.0 {
                    configured.iter().map(|(k, w)| (*k, w / total)).collect()
                } else {
                    configured.clone()
                }
            }
            _ => {
                let n = trading.len();
                if n == 0 {
                    BTreeMap::new()
                } else {
                    trading.iter().map(|s| (s.kind, 1.0 / n as f64)).collect()
                }
            }
        }
    }

    pub fn combine(&self, signals: &[SignalResult], date: NaiveDate) -> Forecast {
        if signals.is_empty() {
            return Forecast {
                date,
                direction: Direction::Flat,
                confidence: 0.0,
                position_size: 0.0,
                weighted_score: 0.0,
                explanation: Explanation {
                    top_contributors: Vec::new(),
                    regime_description: "No signals available".to_string(),
                },
            };
        }

        let regime = signals.iter().find(|s| s.kind.is_regime());
        let trading: Vec<&SignalResult> = signals.iter().filter(|s| !s.kind.is_regime()).collect();
        let weights = self.resolve_weights(&trading);

        let mut weighted_sum = 0.0;
        let mut base_confidence = 0.0;
        let mut contributors = Vec::with_capacity(trading.len());
        for s in &trading {
            let w = weights.get(&s.kind).copied().unwrap_or(0.0);
            let contribution = w * s.score;
            weighted_sum += contribution;
            base_confidence += w * s.confidence;
            contributors.push(Contributor {
                signal: s.name.to_string(),
                kind: s.kind,
                contribution,
                weight: w,
                score: s.score,
                confidence: s.confidence,
            });
        }

        let rw = self.regime_weight;
        let (multiplier, regime_description) = match regime {
            Some(r) => {
                let m = r.score.clamp(0.0, 1.0);
                let raw_scale = if m < 0.5 { 0.5 } else { 1.0 };
                weighted_sum *= (1.0 - rw) + rw * raw_scale;
                (m, r.description.clone())
            }
            None => (1.0, "Unknown regime".to_string()),
        };

        let direction = if weighted_sum > self.threshold {
            Direction::Long
        } else if weighted_sum < -self.threshold {
            Direction::Short
        } else {
            Direction::Flat
        };

        let conf_scale = (1.0 - rw) + rw * (0.7 + 0.3 * multiplier);
        let confidence = (base_confidence * conf_scale).clamp(0.0, 1.0);

        let position_size = if direction == Direction::Flat {
            0.0
        } else {
            (confidence * weighted_sum.abs()).min(1.0)
        };

        contributors.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        contributors.truncate(MAX_CONTRIBUTORS);

        Forecast {
            date,
            direction,
            confidence,
            position_size,
            weighted_score: weighted_sum,
            explanation: Explanation {
                top_contributors: contributors,
                regime_description,
            },
        }
    }
}

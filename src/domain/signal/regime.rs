//! Regime filter: judges whether volatility and trend clarity favour taking risk.

use super::{Signal, SignalKind, SignalResult, clip};
use crate::domain::features::FeatureFrame;
use crate::domain::features::rolling::mean;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct RegimeFilterSignal;

/// Annualised volatility bucket score.
fn vol_score(vol: f64) -> f64 {
    if vol < 0.05 {
        0.3
    } else if vol > 0.8 {
        0.2
    } else if (0.1..=0.5).contains(&vol) {
        1.0
    } else {
        0.6
    }
}

fn vol_change_score(change: f64) -> f64 {
    if change < -0.2 {
        1.2
    } else if change > 0.3 {
        0.5
    } else {
        1.0
    }
}

impl Signal for RegimeFilterSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Regime
    }

    fn name(&self) -> &'static str {
        "Market Regime (trend/vol filter)"
    }

    fn compute(&self, features: &FeatureFrame, date: NaiveDate) -> SignalResult {
        let Some(row) = features.row_at_or_before(date) else {
            return SignalResult::neutral(
                self.kind(),
                self.name(),
                date,
                0.0,
                "Insufficient data for regime filter",
            );
        };

        let vol = row.realized_vol_20d.filter(|v| v.is_finite());
        let trend = row.trend_vs_chop.filter(|v| v.is_finite()).map(f64::abs);
        let change = row.vol_change.filter(|v| v.is_finite());

        if vol.is_none() && trend.is_none() {
            return SignalResult::neutral(
                self.kind(),
                self.name(),
                date,
                0.5,
                "Missing regime features",
            );
        }

        let v_score = vol.map_or(1.0, vol_score);
        let t_score = trend.map_or(1.0, |t| (t * 2.0).min(1.0));
        let c_score = change.map_or(1.0, vol_change_score);
        let score = clip(mean(&[v_score, t_score, c_score]), 0.0, 1.0);

        let confidence = match (vol, trend) {
            (Some(v), Some(t)) => {
                if (0.15..=0.4).contains(&v) && t > 0.3 {
                    0.9
                } else if v_score < 0.4 || t_score < 0.3 {
                    0.3
                } else {
                    0.6
                }
            }
            _ => 0.5,
        };

        let mut labels = Vec::new();
        let mut reasons = Vec::new();
        let mut components = BTreeMap::new();
        if let Some(v) = vol {
            labels.push(if v < 0.1 {
                "low vol"
            } else if v > 0.6 {
                "high vol"
            } else {
                "moderate vol"
            });
            components.insert("realized_vol_20d".to_string(), v);
            reasons.push(format!("vol={v:.3}"));
        }
        if let Some(t) = trend {
            labels.push(if t > 0.5 {
                "strong trend"
            } else if t < 0.2 {
                "choppy"
            } else {
                "weak trend"
            });
            components.insert("trend_vs_chop".to_string(), t);
            reasons.push(format!("trend_strength={t:.3}"));
        }
        if let Some(c) = change {
            components.insert("vol_change".to_string(), c);
            if c < -0.1 {
                reasons.push("vol_decreasing".to_string());
            } else if c > 0.1 {
                reasons.push("vol_increasing".to_string());
            }
        }

        SignalResult {
            kind: self.kind(),
            name: self.name(),
            date,
            score,
            confidence,
            description: format!(
                "Market Regime ({}): Is the market environment favorable for taking risk? \
                 Score={score:.2}",
                labels.join(", ")
            ),
            reason: Some(reasons.join(", ")),
            components,
        }
    }
}
